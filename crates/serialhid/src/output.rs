use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serialhid_monitor::EntitySnapshot;

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
struct ReportOutput<'a, R> {
    device: &'a str,
    seq: u64,
    report: &'a R,
    timestamp: String,
}

/// Print one decoded report.
///
/// Reports are rendered through their serde form, so every device shares
/// one code path; the table lays the top-level fields out as columns.
pub fn print_report<R: Serialize>(device: &str, seq: u64, report: &R, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReportOutput {
                device,
                seq,
                report,
                timestamp: now_unix_seconds(),
            };
            println!("{}", to_json(&out));
        }
        OutputFormat::Table => {
            let fields = report_fields(report);
            let mut header = vec!["SEQ".to_string()];
            let mut row = vec![seq.to_string()];
            for (name, value) in fields {
                header.push(name.to_uppercase());
                row.push(value);
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(header)
                .add_row(row);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let fields = report_fields(report)
                .into_iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!("#{seq} {device} {fields}");
        }
        OutputFormat::Raw => println!("{}", to_json(report)),
    }
}

/// Print the final entity counters after a monitor stops.
pub fn print_summary(snapshots: &[EntitySnapshot], format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => println!("{}", to_json(&snapshots)),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENTITY", "LIFECYCLE", "TICKS", "REPORTS", "EXCEPTIONS"]);
            for snapshot in snapshots {
                table.add_row(vec![
                    snapshot.kind.to_string(),
                    snapshot.lifecycle.to_string(),
                    snapshot.ticks.to_string(),
                    snapshot.reports.to_string(),
                    snapshot.exceptions.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for snapshot in snapshots {
                println!(
                    "{} entity: lifecycle={} ticks={} reports={} exceptions={}",
                    snapshot.kind,
                    snapshot.lifecycle,
                    snapshot.ticks,
                    snapshot.reports,
                    snapshot.exceptions
                );
            }
        }
    }
}

/// Print rows as a table, or as a JSON array for machine formats.
pub fn print_rows<T: Serialize>(
    header: &[&str],
    rows: &[T],
    cells: impl Fn(&T) -> Vec<String>,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => println!("{}", to_json(&rows)),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(header.to_vec());
            for row in rows {
                table.add_row(cells(row));
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                let line = header
                    .iter()
                    .zip(cells(row))
                    .map(|(name, value)| format!("{}={value}", name.to_lowercase()))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("{line}");
            }
        }
    }
}

/// Flatten a report's serde form into `(field, value)` pairs.
///
/// Nested objects (mouse buttons, pointer) stay as compact JSON.
fn report_fields<R: Serialize>(report: &R) -> Vec<(String, String)> {
    match serde_json::to_value(report) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .map(|(name, value)| (name, value.to_string()))
            .collect(),
        Ok(other) => vec![("value".to_string(), other.to_string())],
        Err(_) => Vec::new(),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
