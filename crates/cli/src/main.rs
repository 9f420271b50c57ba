//! Paybank CLI - transfers, requests and parties from the command line
//!
//! Usage:
//! ```bash
//! paybank user add alice "Alice Pop"
//! paybank --actor alice account open RON --credit-limit 200
//! paybank deposit ACC_... 100 --from-name Employer --from-iban DE89370400440532013000
//! paybank --actor alice transfer ACC_a ACC_b 40 --note rent
//! paybank --actor alice send ACC_a bob 15
//! paybank --actor alice request create ACC_a bob -- -30
//! paybank --actor alice party create ACC_a dinner --member bob=10 --member carol=15
//! paybank --actor bob feed --long
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use paybank_business::BusinessError;
use paybank_core::PartyShare;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod db;

use commands::{account, audit, feed, money, party, request, user};

/// Paybank - ledger transfers and settlement over SQLite
#[derive(Parser)]
#[command(name = "paybank")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file path
    #[arg(long, env = "PAYBANK_DB", default_value = "data/paybank.db", global = true)]
    pub db: PathBuf,

    /// Audit log directory
    #[arg(long, env = "PAYBANK_EVENTS_DIR", default_value = "data/events", global = true)]
    pub events_dir: PathBuf,

    /// Exchange rate table (JSON)
    #[arg(long, env = "PAYBANK_RATES", default_value = "config/rates.json", global = true)]
    pub rates: PathBuf,

    /// Authenticated user the command acts as
    #[arg(long, env = "PAYBANK_USER", global = true)]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// User directory
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Account management
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Credit an account with money arriving from outside the bank
    Deposit {
        account_id: String,
        amount: Decimal,
        #[arg(long, default_value = "External")]
        from_name: String,
        #[arg(long, default_value = "")]
        from_iban: String,
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Transfer between two accounts (exchanges when currencies differ)
    Transfer {
        from_account: String,
        to_account: String,
        amount: Decimal,
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Transfer to an IBAN, inside or outside the bank
    Pay {
        from_account: String,
        iban: String,
        amount: Decimal,
        /// Recipient name, recorded for external IBANs
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Send money to a user: immediate for mutual friends, a request otherwise
    Send {
        from_account: String,
        to_user: String,
        amount: Decimal,
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Transfer requests
    Request {
        #[command(subcommand)]
        action: RequestAction,
    },

    /// Bill-split parties
    Party {
        #[command(subcommand)]
        action: PartyAction,
    },

    /// Activity feed of the acting user (JSON)
    Feed {
        /// Full history instead of the notifications digest
        #[arg(long)]
        long: bool,
    },

    /// Account statement for a date range (JSON)
    Statement {
        account_id: String,
        /// Start date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// End date, exclusive (YYYY-MM-DD)
        #[arg(long)]
        to: String,
    },

    /// Read back the audit log
    Audit {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        subject: Option<String>,
    },

    /// Show database status
    Status,
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a user
    Add { user_id: String, name: String },
    /// List `friend` as a friend of the acting user
    Befriend { friend: String },
    /// Show a user and their accounts
    Show { user_id: String },
}

#[derive(Subcommand)]
pub enum AccountAction {
    /// Open an account for the acting user
    Open {
        /// Currency code (e.g. RON, EUR)
        currency: String,
        #[arg(long, default_value = "0")]
        credit_limit: Decimal,
    },
    /// List the acting user's accounts
    List,
    Show { account_id: String },
    /// Soft-disable an account
    Disable { account_id: String },
    /// Use an account as the default for incoming sends
    Default { account_id: String },
}

#[derive(Subcommand)]
pub enum RequestAction {
    /// Create a request. Positive amount: you send; negative: you ask to be paid
    Create {
        from_account: String,
        to_user: String,
        #[arg(allow_hyphen_values = true)]
        amount: Decimal,
        #[arg(long, default_value = "")]
        note: String,
    },
    /// Accept, paying from / receiving into one of your accounts
    Accept { request_id: String, account_id: String },
    Decline { request_id: String },
    Cancel { request_id: String },
    /// Pending requests of the acting user
    List,
}

#[derive(Subcommand)]
pub enum PartyAction {
    /// Create a party with `user=amount` members
    Create {
        host_account: String,
        note: String,
        #[arg(long = "member", value_parser = parse_share, required = true)]
        members: Vec<PartyShare>,
    },
    /// Decline every pending member request
    Cancel { party_id: String },
    Show { party_id: String },
}

fn parse_share(s: &str) -> Result<PartyShare, String> {
    let (user, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("expected user=amount, got '{}'", s))?;
    let amount: Decimal = amount
        .trim()
        .parse()
        .map_err(|e| format!("invalid amount '{}': {}", amount, e))?;
    Ok(PartyShare::new(user.trim(), amount))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<BusinessError>().and_then(|e| e.user_code().map(|c| (c, e))) {
                Some((code, e)) => eprintln!("❌ {}: {}", code, e),
                None => eprintln!("❌ {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = config::Settings::from_cli(&cli);

    let session = db::Session::open(&settings).await?;
    let actor = settings.actor.as_deref();

    match cli.command {
        Commands::Status => db::show_status(&session).await?,
        Commands::User { action } => user::handle(&session, actor, action).await?,
        Commands::Account { action } => account::handle(&session, actor, action).await?,
        Commands::Deposit {
            account_id,
            amount,
            from_name,
            from_iban,
            note,
        } => money::deposit(&session, &account_id, amount, &from_name, &from_iban, &note).await?,
        Commands::Transfer {
            from_account,
            to_account,
            amount,
            note,
        } => {
            let actor = config::require_actor(actor)?;
            money::transfer(&session, actor, &from_account, &to_account, amount, &note).await?
        }
        Commands::Pay {
            from_account,
            iban,
            amount,
            name,
            note,
        } => {
            let actor = config::require_actor(actor)?;
            money::pay(&session, actor, &from_account, &iban, &name, amount, &note).await?
        }
        Commands::Send {
            from_account,
            to_user,
            amount,
            note,
        } => {
            let actor = config::require_actor(actor)?;
            money::send(&session, actor, &from_account, &to_user, amount, &note).await?
        }
        Commands::Request { action } => {
            request::handle(&session, config::require_actor(actor)?, action).await?
        }
        Commands::Party { action } => {
            party::handle(&session, config::require_actor(actor)?, action).await?
        }
        Commands::Feed { long } => feed::feed(&session, config::require_actor(actor)?, long).await?,
        Commands::Statement { account_id, from, to } => {
            feed::statement(&session, &account_id, &from, &to).await?
        }
        Commands::Audit { user, subject } => audit::show(&session, user, subject)?,
    }

    session.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_share() {
        let share = parse_share("bob=-12.5").unwrap();
        assert_eq!(share.user_id, "bob");
        assert_eq!(share.amount, dec!(-12.5));

        assert!(parse_share("bob").is_err());
        assert!(parse_share("bob=abc").is_err());
    }

    #[test]
    fn test_cli_parses_negative_request() {
        let cli = Cli::try_parse_from([
            "paybank", "--actor", "alice", "request", "create", "ACC_1", "bob", "-30",
        ])
        .unwrap();
        match cli.command {
            Commands::Request {
                action: RequestAction::Create { amount, .. },
            } => assert_eq!(amount, dec!(-30)),
            _ => panic!("expected request create"),
        }
    }
}
