use std::fs;
use std::io::Read;

use serde_json::Value;

use crate::cli::InspectArgs;
use crate::error::CliError;

use super::{analyze, CommandResult};

pub fn run(args: &InspectArgs) -> Result<CommandResult, CliError> {
    let raw = match &args.file {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let payload = parse_payload(&raw)?;
    let (data, errors) = analyze(&payload, &args.fields, args.mode.into())?;

    Ok(CommandResult::ok(data).with_errors(errors))
}

fn parse_payload(raw: &str) -> Result<Value, CliError> {
    serde_json::from_str(raw).map_err(CliError::InvalidInput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ModeArg;
    use std::io::Write;

    #[test]
    fn inspects_a_saved_payload() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"data": {{"currency": "BTC", "rates": {{"USD": "1", "EUR": "2"}}}}}}"#
        )
        .expect("writes");

        let args = InspectArgs {
            file: Some(file.path().to_path_buf()),
            fields: Vec::new(),
            mode: ModeArg::Card,
        };
        let result = run(&args).expect("inspects");

        assert!(result.errors.is_empty());
        assert_eq!(result.data["shape"], "crypto-rates");
        assert_eq!(result.data["normalized"]["rates"][1]["symbol"], "EUR");
    }

    #[test]
    fn invalid_json_is_an_input_error() {
        let error = parse_payload("{not json").expect_err("rejects");

        assert!(matches!(error, CliError::InvalidInput(_)));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let args = InspectArgs {
            file: Some(std::path::PathBuf::from("/definitely/not/here.json")),
            fields: Vec::new(),
            mode: ModeArg::Card,
        };

        assert!(matches!(run(&args), Err(CliError::Io(_))));
    }
}
