use serde::Serialize;
use serialhid_channel::{ModemBits, TtyChannel};
use tracing::info;

use crate::cmd::settings::Settings;
use crate::cmd::ModemArgs;
use crate::exit::{channel_error, CliResult, SUCCESS};
use crate::output::{print_rows, OutputFormat};

#[derive(Debug, Serialize)]
struct ModemRow {
    path: String,
    #[serde(flatten)]
    lines: ModemBits,
}

pub fn run(args: ModemArgs, format: OutputFormat) -> CliResult<i32> {
    let settings = Settings::load(args.config.as_deref())?;
    let mut channel = TtyChannel::open(&args.path, &settings.channel)
        .map_err(|err| channel_error("open failed", err))?;

    if args.dtr.is_some() || args.rts.is_some() {
        let current = channel
            .modem_bits()
            .map_err(|err| channel_error("read modem lines", err))?;
        let wanted = apply_outputs(current, args.dtr, args.rts);
        channel
            .set_modem_bits(wanted)
            .map_err(|err| channel_error("set modem lines", err))?;
        info!(path = %args.path.display(), dtr = wanted.dtr, rts = wanted.rts, "modem outputs set");
    }

    let lines = channel
        .modem_bits()
        .map_err(|err| channel_error("read modem lines", err))?;
    let rows = [ModemRow {
        path: args.path.display().to_string(),
        lines,
    }];

    print_rows(
        &["PATH", "DTR", "RTS", "CTS", "DSR", "CD", "RI"],
        &rows,
        |row| {
            let l = row.lines;
            vec![
                row.path.clone(),
                on_off(l.dtr),
                on_off(l.rts),
                on_off(l.cts),
                on_off(l.dsr),
                on_off(l.cd),
                on_off(l.ri),
            ]
        },
        format,
    );
    Ok(SUCCESS)
}

/// Keep the current outputs unless overridden. Input lines never change.
fn apply_outputs(current: ModemBits, dtr: Option<bool>, rts: Option<bool>) -> ModemBits {
    ModemBits::outputs(dtr.unwrap_or(current.dtr), rts.unwrap_or(current.rts))
}

fn on_off(on: bool) -> String {
    let text = if on { "on" } else { "off" };
    text.to_string()
}
