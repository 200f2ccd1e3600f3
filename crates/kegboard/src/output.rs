use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use kegboard_message::Message;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    timestamp: String,
    #[serde(flatten)]
    message: &'a Message,
}

pub fn print_message(message: &Message, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                timestamp: now_unix_seconds(),
                message,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["MESSAGE", "ID", "FIELD", "VALUE"]);
            let mut first = true;
            for (name, value) in message.fields() {
                let (kind, id) = if first {
                    (message.name().to_string(), format!("0x{:02x}", message.id()))
                } else {
                    (String::new(), String::new())
                };
                table.add_row(vec![kind, id, name.to_string(), value.to_string()]);
                first = false;
            }
            if first {
                table.add_row(vec![
                    message.name().to_string(),
                    format!("0x{:02x}", message.id()),
                    String::new(),
                    String::new(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{message}");
        }
        OutputFormat::Raw => {
            if let Ok(wire) = message.to_frame_bytes() {
                print_raw(&wire);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
