use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use framerelay_relay::{ResponderStats, SlotSnapshot};
use framerelay_wire::{status_name, ImageReply};
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
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    sequence: u64,
    status: i32,
    status_name: &'a str,
    payload_size: usize,
    format: &'a str,
    peer: &'a str,
    timestamp: String,
}

/// Print one image reply received by `poll`.
pub fn print_reply(sequence: u64, reply: &ImageReply, peer: &str, format: OutputFormat) {
    let payload_size = reply.payload().map_or(0, |payload| payload.len());
    let payload_format = reply.payload().map_or("-", |payload| payload_kind(payload));

    match format {
        OutputFormat::Json => {
            let out = ReplyOutput {
                sequence,
                status: reply.status(),
                status_name: status_name(reply.status()),
                payload_size,
                format: payload_format,
                peer,
                timestamp: now_unix_seconds(),
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
                .set_header(vec!["SEQ", "STATUS", "SIZE", "FORMAT", "PEER"])
                .add_row(vec![
                    sequence.to_string(),
                    status_name(reply.status()).to_string(),
                    payload_size.to_string(),
                    payload_format.to_string(),
                    peer.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "seq={} status={} ({}) size={} format={} peer={}",
                sequence,
                reply.status(),
                status_name(reply.status()),
                payload_size,
                payload_format,
                peer
            );
        }
        OutputFormat::Raw => {
            if let Some(payload) = reply.payload() {
                print_raw(payload);
            }
        }
    }
}

#[derive(Serialize)]
struct ServeSummary {
    settings: u64,
    image_requests: u64,
    fresh: u64,
    unchanged: u64,
    no_data: u64,
    published: u64,
    dropped: u64,
}

/// Print the counters of a finished `serve` session.
pub fn print_serve_summary(stats: &ResponderStats, slot: &SlotSnapshot, format: OutputFormat) {
    let out = ServeSummary {
        settings: stats.settings,
        image_requests: stats.image_requests,
        fresh: stats.fresh,
        unchanged: stats.unchanged,
        no_data: stats.no_data,
        published: slot.published,
        dropped: slot.dropped(),
    };

    match format {
        OutputFormat::Json => {
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
                .set_header(vec!["COUNTER", "VALUE"]);
            for (name, value) in [
                ("settings", out.settings),
                ("image_requests", out.image_requests),
                ("fresh", out.fresh),
                ("unchanged", out.unchanged),
                ("no_data", out.no_data),
                ("published", out.published),
                ("dropped", out.dropped),
            ] {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "requests={} fresh={} unchanged={} no_data={} settings={} published={} dropped={}",
                out.image_requests,
                out.fresh,
                out.unchanged,
                out.no_data,
                out.settings,
                out.published,
                out.dropped
            );
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Best-effort payload kind from the leading bytes.
pub fn payload_kind(payload: &[u8]) -> &'static str {
    match payload {
        [b'P', b'5' | b'6', b'\n', ..] => "pnm",
        [0xFF, 0xD8, 0xFF, ..] => "jpeg",
        [0x89, b'P', b'N', b'G', ..] => "png",
        _ => "raw",
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
