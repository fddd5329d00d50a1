use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

use ldapaas::paths::{default_config_path, CONFIG_ENV};
use ldapaas::{
    dispatch, error_response, AppConfig, Operation, RequestContext, Result,
    SystemInstanceManager,
};

/// Manage per-user LDAP directory-server instances.
#[derive(Parser)]
#[command(name = "ldapaas", version, about)]
struct Cli {
    /// Config file (default: ~/.ldapaas/config.toml)
    #[arg(long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Requesting user (default: $REMOTE_USER, then $PHP_AUTH_USER)
    #[arg(long)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an instance on the next free port
    Create {
        #[arg(long)]
        base_dn: String,
        /// Administrative password (generated when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Port to use instead of the next free one
        #[arg(long)]
        port: Option<String>,
    },
    /// Show an instance
    Read { name: String },
    /// Stop and remove an instance
    Delete { name: String },
    /// Restart an instance
    Restart { name: String },
    /// Delete and recreate an instance with the same identity
    Purge { name: String },
    /// List your instances
    List,
    /// Delete all your instances
    Reset,
}

impl From<Command> for Operation {
    fn from(command: Command) -> Self {
        match command {
            Command::Create {
                base_dn,
                password,
                port,
            } => Self::Create {
                base_dn,
                password,
                port,
            },
            Command::Read { name } => Self::Read { name },
            Command::Delete { name } => Self::Delete { name },
            Command::Restart { name } => Self::Restart { name },
            Command::Purge { name } => Self::Purge { name },
            Command::List => Self::Index,
            Command::Reset => Self::Reset,
        }
    }
}

fn init_logging(level: &str) {
    env_logger::Builder::new()
        .parse_filters(level)
        .parse_default_env()
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };
    AppConfig::load(&path)
}

fn requesting_user(cli_user: Option<String>) -> Option<String> {
    cli_user
        .or_else(|| std::env::var("REMOTE_USER").ok())
        .or_else(|| std::env::var("PHP_AUTH_USER").ok())
}

async fn run(config: &AppConfig, user: Option<String>, command: Command) -> Result<Value> {
    let ctx = RequestContext::new(user.as_deref(), config.resolve_host()?)?;
    let manager = SystemInstanceManager::from_config(config);
    dispatch(&manager, &ctx, command.into()).await
}

fn print_error(err: &ldapaas::AppError) -> ExitCode {
    let (_, body) = error_response(err);
    println!("{body}");
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config) {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            return print_error(&e);
        }
    };
    init_logging(&config.log_level);

    match run(&config, requesting_user(cli.user), cli.command).await {
        Ok(body) => {
            println!("{body}");
            ExitCode::SUCCESS
        }
        Err(e) => print_error(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_create() {
        let cli = Cli::parse_from(["ldapaas", "--user", "alice", "create", "--base-dn", "dc=x"]);
        assert_eq!(cli.user.as_deref(), Some("alice"));
        assert_eq!(
            Operation::from(cli.command),
            Operation::Create {
                base_dn: "dc=x".to_string(),
                password: None,
                port: None,
            }
        );
    }

    #[test]
    fn parse_list_maps_to_index() {
        let cli = Cli::parse_from(["ldapaas", "list"]);
        assert_eq!(Operation::from(cli.command), Operation::Index);
    }

    #[test]
    fn parse_purge() {
        let cli = Cli::parse_from(["ldapaas", "purge", "alice4200"]);
        assert_eq!(
            Operation::from(cli.command),
            Operation::Purge {
                name: "alice4200".to_string()
            }
        );
    }
}
