use serde::Serialize;
use serialhid_channel::{list_ports, list_ports_in, PortInfo};

use crate::cmd::PortsArgs;
use crate::exit::{channel_error, CliResult, SUCCESS};
use crate::output::{print_rows, OutputFormat};

#[derive(Debug, Serialize)]
struct PortRow {
    path: String,
    kind: &'static str,
    unit: u32,
}

impl From<PortInfo> for PortRow {
    fn from(port: PortInfo) -> Self {
        Self {
            path: port.path.display().to_string(),
            kind: port.kind.name(),
            unit: port.unit,
        }
    }
}

pub fn run(args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let ports = match &args.dir {
        Some(dir) => list_ports_in(dir),
        None => list_ports(),
    }
    .map_err(|err| channel_error("port scan failed", err))?;

    let rows: Vec<PortRow> = ports.into_iter().map(PortRow::from).collect();
    print_rows(
        &["PATH", "KIND", "UNIT"],
        &rows,
        |row| vec![row.path.clone(), row.kind.to_string(), row.unit.to_string()],
        format,
    );
    Ok(SUCCESS)
}
