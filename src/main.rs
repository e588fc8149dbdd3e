use std::process::ExitCode;

use anyhow::Context;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use w3c_validators::{
    AssertionOptions, Cli, ConfigManager, MarkupAssertion, MarkupValidatorClient, Output,
    ValidationInput, VerbosityLevel,
};

const EXIT_VALID: u8 = 0;
const EXIT_INVALID: u8 = 1;
const EXIT_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(&cli);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("w3c_validators={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    cli.validate()?;

    let config = ConfigManager::load_config(&cli)
        .await
        .context("Failed to load configuration")?;
    debug!(?config, "configuration loaded");

    let client = MarkupValidatorClient::from_config(&config)?;
    let request = cli.validator_options()?;

    let (source, input, options) = read_input(&cli).await?;
    info!(source = %source, endpoint = %client.endpoint(), "validating");

    let assertion = MarkupAssertion::new(client, options).with_request_options(request);
    let output = Output::new(
        config.output.format.into(),
        VerbosityLevel::from_flags(config.output.verbose, config.output.quiet),
    );

    match assertion.matches(Some(input)).await {
        Ok(outcome) => {
            println!("{}", output.format_response(&source, outcome.response()));
            Ok(if outcome.passed() {
                EXIT_VALID
            } else {
                EXIT_INVALID
            })
        }
        Err(e) => {
            println!("{}", output.format_error(&source, &e));
            Ok(EXIT_ERROR)
        }
    }
}

/// Work out what to send: a local file, the positional input, or stdin
async fn read_input(cli: &Cli) -> anyhow::Result<(String, ValidationInput, AssertionOptions)> {
    let options = cli.assertion_options();

    if let Some(path) = &cli.file {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return Ok((path.display().to_string(), ValidationInput::Bytes(bytes), options));
    }

    if let Some(input) = &cli.input {
        return Ok((
            display_source(input),
            ValidationInput::from_text(input.as_str(), options.convert_strings_to_uri),
            options,
        ));
    }

    let mut markup = String::new();
    tokio::io::stdin()
        .read_to_string(&mut markup)
        .await
        .context("Failed to read markup from stdin")?;

    // Standard input is always markup
    Ok(("<stdin>".to_string(), ValidationInput::Text(markup), options))
}

fn display_source(input: &str) -> String {
    let first_line = input.lines().next().unwrap_or_default();
    if first_line.len() < input.len() || first_line.chars().count() > 60 {
        let shortened: String = first_line.chars().take(60).collect();
        format!("{}…", shortened)
    } else {
        first_line.to_string()
    }
}
