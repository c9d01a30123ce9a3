//! Command-line access to the platform credential store.
//!
//! - `save <key> <value>` / `load <key>` / `delete <key>` -- simple calls
//! - `raw add|load|update|delete` -- attribute maps given as JSON

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keychain_kit::store::Attributes;
use keychain_kit::{init_logging, Keychain, KeychainConfig, RawResult};

/// Save, load and delete credentials in the platform secure store.
#[derive(Parser, Debug)]
#[command(name = "keychain", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Service namespace for simple calls (default: from config, then KEYCHAIN_SERVICE)
    #[arg(short, long, global = true)]
    service: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a value under a key, replacing any existing value.
    Save { key: String, value: String },

    /// Print the value stored under a key.
    Load { key: String },

    /// Remove the value stored under a key.
    Delete { key: String },

    /// Pass attribute maps straight to the store.
    #[command(subcommand)]
    Raw(RawCommand),
}

#[derive(Subcommand, Debug)]
enum RawCommand {
    /// Delete what the item would replace, then add it.
    Add { attributes: String },

    /// Run a copy-matching query.
    Load { query: String },

    /// Apply attributes to the items matching a query.
    Update { query: String, attributes: String },

    /// Delete the items matching a query.
    Delete { query: String },
}

fn parse_attributes(raw: &str) -> Result<Attributes> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("attribute map is not valid JSON")?;
    Ok(Attributes::from_json(&value)?)
}

fn report(result: &RawResult) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    Ok(exit_code(result.success))
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run(cli: Cli, config: KeychainConfig) -> Result<ExitCode> {
    let config = KeychainConfig {
        service: cli.service.or(config.service),
        ..config
    };
    let keychain = Keychain::from_config(&config);
    tracing::debug!(service = keychain.service(), "Using service");

    match cli.command {
        Command::Save { key, value } => Ok(exit_code(keychain.save(&value, &key))),
        Command::Load { key } => match keychain.load(&key) {
            Some(value) => {
                println!("{}", value);
                Ok(ExitCode::SUCCESS)
            }
            None => {
                eprintln!("No value stored for '{}'", key);
                Ok(ExitCode::FAILURE)
            }
        },
        Command::Delete { key } => Ok(exit_code(keychain.delete(&key))),
        Command::Raw(raw) => match raw {
            RawCommand::Add { attributes } => {
                report(&keychain.save_attributes(&parse_attributes(&attributes)?))
            }
            RawCommand::Load { query } => report(&keychain.load_query(&parse_attributes(&query)?)),
            RawCommand::Update { query, attributes } => report(&keychain.update(
                &parse_attributes(&query)?,
                &parse_attributes(&attributes)?,
            )),
            RawCommand::Delete { query } => {
                report(&keychain.delete_query(&parse_attributes(&query)?))
            }
        },
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = KeychainConfig::load();
    init_logging(config.log_filter.as_deref().unwrap_or("warn"));

    run(cli, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_simple_commands() {
        let cli = Cli::try_parse_from(["keychain", "--service", "svc", "save", "k", "v"]).unwrap();
        assert_eq!(cli.service.as_deref(), Some("svc"));
        assert!(matches!(cli.command, Command::Save { ref key, ref value } if key == "k" && value == "v"));

        let cli = Cli::try_parse_from(["keychain", "load", "k", "-s", "other"]).unwrap();
        assert_eq!(cli.service.as_deref(), Some("other"));
    }

    #[test]
    fn test_cli_parses_raw_update() {
        let cli = Cli::try_parse_from([
            "keychain",
            "raw",
            "update",
            r#"{"class":"genp","acct":"a"}"#,
            r#"{"labl":"x"}"#,
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Raw(RawCommand::Update { .. })));
    }

    #[test]
    fn test_parse_attributes() {
        let attrs = parse_attributes(r#"{"class":"genp","acct":"alice","r_Data":true}"#).unwrap();
        assert_eq!(attrs.account(), Some("alice"));
        assert!(attrs.wants_data());

        assert!(parse_attributes("not json").is_err());
        assert!(parse_attributes("[1, 2]").is_err());
    }
}
