use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use longboard_auth::{AccountingFlow, MarketplaceFlow};
use longboard_config::{Config, LogConfig};
use longboard_provider::{
    AccountingClientProvider, AccountingService, MarketplaceClientProvider, MarketplaceService,
    default_chain,
};
use longboard_types::{Credential, LongboardError, ProviderId};
use std::io::BufRead as _;
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "longboard", about = "Marketplace and accounting API client")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an interactive login and print the issued token as JSON.
    Login {
        /// Provider name (marketplace / upwork, accounting / wave).
        provider: String,
        /// OAuth1 callback for the marketplace; defaults to the configured one or `oob`.
        #[arg(long)]
        callback: Option<String>,
    },
    /// Renew an accounting access token.
    Refresh {
        #[arg(long)]
        refresh_token: String,
        /// The access token being replaced, if known.
        #[arg(long, default_value = "")]
        access_token: String,
    },
    /// Print the marketplace earnings report for a user as JSON records.
    Earnings {
        #[arg(long)]
        token: String,
        #[arg(long)]
        token_secret: String,
        /// First day, `YYYY-MM-DD`.
        #[arg(long)]
        from: NaiveDate,
        /// Last day, `YYYY-MM-DD`.
        #[arg(long)]
        to: NaiveDate,
        /// User reference; defaults to the token's owner.
        #[arg(long)]
        user: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("config error: {e}"))?;
    init_tracing(&config.log);

    let outcome = match cli.command {
        Commands::Login { provider, callback } => {
            cmd_login(&config, &provider, callback.as_deref()).await
        }
        Commands::Refresh {
            refresh_token,
            access_token,
        } => cmd_refresh(&config, access_token, refresh_token).await,
        Commands::Earnings {
            token,
            token_secret,
            from,
            to,
            user,
        } => {
            let token = Credential::with_secret(token, token_secret);
            cmd_earnings(&config, &token, from, to, user.as_deref()).await
        }
    };

    outcome.map_err(|e| {
        let classified = default_chain().classify_or_internal(&e);
        anyhow::anyhow!("{}: {}", classified.error_type(), classified.message)
    })
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn prompt(label: &str) -> Result<String, LongboardError> {
    eprint!("{label}: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| LongboardError::Validation(format!("cannot read {label}: {e}")))?;
    Ok(line.trim().to_string())
}

fn print_json(value: &impl serde::Serialize) -> Result<(), LongboardError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_login(
    config: &Config,
    provider: &str,
    callback: Option<&str>,
) -> Result<(), LongboardError> {
    match provider.parse::<ProviderId>()? {
        ProviderId::Marketplace => {
            let flow = MarketplaceFlow::new(&config.marketplace)?;
            let request = flow.start_login(callback).await?;
            eprintln!("Open this URL and authorize access:\n{}", request.authorization_url());
            let verifier = prompt("verifier")?;
            let token = flow.exchange(&request, &verifier).await?;
            print_json(&token)
        }
        ProviderId::Accounting => {
            let flow = AccountingFlow::new(&config.accounting)?;
            let request = flow.login_url(&longboard_auth::state::random_state())?;
            eprintln!("Open this URL and authorize access:\n{}", request.authorization_url());
            let code = prompt("authorization code")?;
            let token = flow.exchange(&code).await?;
            print_json(&token)
        }
    }
}

async fn cmd_refresh(
    config: &Config,
    access_token: String,
    refresh_token: String,
) -> Result<(), LongboardError> {
    let service = AccountingService::new(
        Arc::new(AccountingClientProvider::new(&config.accounting)?),
        AccountingFlow::new(&config.accounting)?,
    );
    let renewed = service
        .refresh(&Credential::with_secret(access_token, refresh_token))
        .await?;
    print_json(&renewed)
}

async fn cmd_earnings(
    config: &Config,
    token: &Credential,
    from: NaiveDate,
    to: NaiveDate,
    user: Option<&str>,
) -> Result<(), LongboardError> {
    let service = MarketplaceService::new(Arc::new(MarketplaceClientProvider::new(
        &config.marketplace,
    )?));
    let records = service.earnings_for_user(token, from, to, user).await?;
    tracing::info!(count = records.len(), "earnings report fetched");
    print_json(&records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_earnings_args() {
        let cli = Cli::try_parse_from([
            "longboard",
            "earnings",
            "--token",
            "t",
            "--token-secret",
            "s",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-31",
        ])
        .unwrap();
        match cli.command {
            Commands::Earnings { from, user, .. } => {
                assert_eq!(from, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
                assert!(user.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_login_with_global_config() {
        let cli =
            Cli::try_parse_from(["longboard", "login", "wave", "--config", "lb.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("lb.yaml")));
        assert!(matches!(cli.command, Commands::Login { ref provider, .. } if provider == "wave"));
    }
}
