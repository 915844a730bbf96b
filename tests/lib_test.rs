//! Library integration tests.

use stagehand::StagehandError;

#[test]
fn error_types_are_public() {
    let err = StagehandError::NoActiveTarget {
        operation: "remote".into(),
    };
    assert!(err.to_string().contains("remote"));
}

#[test]
fn result_type_alias_is_public() {
    fn test_fn() -> stagehand::Result<()> {
        Ok(())
    }
    assert!(test_fn().is_ok());
}

#[test]
fn cli_types_are_public() {
    use clap::Parser;
    use stagehand::cli::Cli;

    let cli = Cli::parse_from(["stagehand", "--no-color", "deploy", "prod"]);
    assert!(cli.no_color);
    assert_eq!(cli.args, vec!["deploy", "prod"]);
}

#[test]
fn anyhow_errors_convert() {
    fn failing() -> stagehand::Result<()> {
        Err(anyhow::anyhow!("remote side hung up"))?
    }
    let err = failing().unwrap_err();
    assert!(matches!(err, StagehandError::Other(_)));
    assert_eq!(err.to_string(), "remote side hung up");
}
