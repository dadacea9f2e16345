//! # Command Line Interface
//!
//! `bankid` runs a single operation against the configured environment and
//! prints the service's answer as JSON. Every flag can also be supplied
//! through its `BANKID_*` environment variable or a `.env` file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use crate::{
    config::{parse_flag, ClientSettings, Environment, LoggingConfig},
    observability::init_logging,
    service::{BankIdClient, ExtraOptions, ServiceResponse},
    transport::SessionOptions,
};

#[derive(Parser, Debug)]
#[command(name = "bankid")]
#[command(about = "BankID relying-party client")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Client identity file under the certificate directory
    #[arg(long, global = true, env = "BANKID_CERT_NAME")]
    pub cert_name: Option<String>,

    /// Target environment (production or test)
    #[arg(long, global = true, env = "BANKID_ENVIRONMENT", default_value = "production")]
    pub environment: Environment,

    /// Installation root holding the certs/ directory
    #[arg(long, global = true, env = "BANKID_CERT_ROOT")]
    pub cert_root: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "BANKID_REQUEST_TIMEOUT_SECONDS")]
    pub timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "BANKID_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON (accepts 1/true/yes/on, like the environment variable)
    #[arg(
        long,
        global = true,
        env = "BANKID_LOG_JSON",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_switch
    )]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an identification order
    Authenticate {
        /// Personal identity number (12 digits)
        personal_number: String,

        /// Extra request parameter as key=value (value may be JSON)
        #[arg(long = "option", value_parser = parse_option)]
        options: Vec<(String, Value)>,
    },

    /// Start a signing order
    Sign {
        /// Personal identity number (12 digits)
        personal_number: String,

        /// Text shown to the user
        #[arg(long)]
        visible: String,

        /// Data signed but not shown to the user
        #[arg(long, default_value = "")]
        hidden: String,

        /// Extra request parameter as key=value (value may be JSON)
        #[arg(long = "option", value_parser = parse_option)]
        options: Vec<(String, Value)>,
    },

    /// Poll an order once
    Collect {
        /// Order reference returned by authenticate or sign
        order_ref: String,
    },
}

#[derive(Serialize)]
struct CommandOutput<'a> {
    operation: String,
    environment: Environment,
    response: &'a Value,
}

impl Cli {
    /// Settings assembled from flags and their environment fallbacks.
    pub fn settings(&self) -> Result<ClientSettings> {
        let cert_name = self
            .cert_name
            .clone()
            .context("A client certificate is required (--cert-name or BANKID_CERT_NAME)")?;

        let settings = ClientSettings {
            cert_root: self.cert_root.clone(),
            request_timeout_seconds: self.timeout,
            logging: LoggingConfig { log_level: self.log_level.clone(), json_logging: self.json_logs },
            ..ClientSettings::new(cert_name, self.environment)
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Run CLI commands
pub async fn run_cli() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = cli.settings()?;
    init_logging(&settings.logging)?;

    let options = SessionOptions { request_timeout: settings.request_timeout() };
    let client = BankIdClient::try_connect_with_options(
        &settings.resolver(),
        &settings.cert_name,
        settings.environment,
        &options,
    )
    .await
    .context("Failed to establish session with the relying-party service")?;

    let response = execute(&client, cli.command).await?;
    print_response(&response, settings.environment)
}

async fn execute(client: &BankIdClient, command: Commands) -> Result<ServiceResponse> {
    let response = match command {
        Commands::Authenticate { personal_number, options } => {
            client.authenticate(&personal_number, into_options(options)).await
        }
        Commands::Sign { personal_number, visible, hidden, options } => {
            client
                .sign(&personal_number, visible.as_bytes(), hidden.as_bytes(), into_options(options))
                .await
        }
        Commands::Collect { order_ref } => client.collect(&order_ref).await,
    };
    Ok(response?)
}

fn print_response(response: &ServiceResponse, environment: Environment) -> Result<()> {
    let output = CommandOutput {
        operation: response.operation().to_string(),
        environment,
        response: response.value(),
    };
    let json = serde_json::to_string_pretty(&output).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

fn into_options(pairs: Vec<(String, Value)>) -> ExtraOptions {
    pairs.into_iter().collect()
}

fn parse_switch(raw: &str) -> std::result::Result<bool, std::convert::Infallible> {
    Ok(parse_flag(raw))
}

/// Parse `key=value`; the value is read as JSON when it parses, otherwise kept
/// as a string.
fn parse_option(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) =
        raw.split_once('=').ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    let value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
