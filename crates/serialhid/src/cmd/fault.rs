use serde::Serialize;
use serialhid_channel::FaultKind;

use crate::cmd::FaultArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_rows, OutputFormat};

#[derive(Debug, Serialize)]
struct FaultRow {
    code: i32,
    kind: &'static str,
    message: String,
    transient: bool,
    channel_loss: bool,
}

impl FaultRow {
    fn interpret(code: i32) -> Self {
        let kind = FaultKind::interpret(code);
        Self {
            code,
            kind: kind.name(),
            message: kind.to_string(),
            transient: kind.is_transient(),
            channel_loss: kind.is_channel_loss(),
        }
    }
}

pub fn run(args: FaultArgs, format: OutputFormat) -> CliResult<i32> {
    let rows: Vec<_> = args.codes.iter().copied().map(FaultRow::interpret).collect();

    print_rows(
        &["CODE", "KIND", "MESSAGE", "TRANSIENT", "CHANNEL LOSS"],
        &rows,
        |row| {
            vec![
                row.code.to_string(),
                row.kind.to_string(),
                row.message.clone(),
                row.transient.to_string(),
                row.channel_loss.to_string(),
            ]
        },
        format,
    );
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use serialhid_channel::OPERATION_FAILED;

    use super::*;

    #[test]
    fn rows_carry_classification() {
        // -EPIPE
        let row = FaultRow::interpret(-32);
        assert_eq!(row.kind, "broken-pipe");
        assert!(row.channel_loss);
        assert!(!row.transient);

        let row = FaultRow::interpret(OPERATION_FAILED);
        assert_eq!(row.kind, "operation-failed");
        assert_eq!(row.message, "operation failed");
    }

    #[test]
    fn unknown_codes_keep_the_code() {
        let row = FaultRow::interpret(99_999);
        assert_eq!(row.kind, "unrecognized");
        assert_eq!(row.message, "unrecognized fault code 99999");
    }
}
