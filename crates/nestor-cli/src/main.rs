//! Nestor - nested group membership queries
//!
//! Operator tool for checking how a directory server resolves group
//! membership: which strategies it gets, who a user is, and whether they
//! belong to a set of groups once nesting is unrolled.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use nestor_core::config::NestorConfig;
use nestor_ldap::{LdapConnector, LdapSession};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "nestor")]
#[command(author = "Nestor Team")]
#[command(version = nestor_core::VERSION)]
#[command(about = "Nested group membership resolution for LDAP and ActiveDirectory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, env = "NESTOR_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "NESTOR_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind as the service account
    TestConnection,

    /// Show the root DSE and the strategies it selects
    Capabilities,

    /// Look a user up by login
    User {
        login: String,
    },

    /// Check whether a user belongs to any of the named groups
    Check {
        login: String,

        /// Group names (cn)
        #[arg(required = true)]
        groups: Vec<String>,
    },

    /// List every member of a group, nested members included
    Members {
        /// Group name (cn)
        group: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => NestorConfig::from_file(path).with_context(|| format!("loading {}", path))?,
        None => NestorConfig::from_env(),
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    let format = cli.log_format.unwrap_or(if config.logging.format.eq_ignore_ascii_case("json") {
        LogFormat::Json
    } else {
        LogFormat::Text
    });

    init_logging(&config.logging.level, format);
    debug!("Connecting to {}", config.directory.server_url());

    let session = LdapSession::new(config.directory, Arc::new(LdapConnector))
        .context("invalid directory configuration")?;
    let ctx = CommandContext {
        session,
        output_format: cli.output,
    };

    match cli.command {
        Commands::TestConnection => commands::connection::test_connection(&ctx).await,
        Commands::Capabilities => commands::connection::capabilities(&ctx).await,
        Commands::User { login } => commands::user::execute(&ctx, &login).await,
        Commands::Check { login, groups } => commands::check::execute(&ctx, &login, &groups).await,
        Commands::Members { group } => commands::members::execute(&ctx, &group).await,
    }
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
    }
}
