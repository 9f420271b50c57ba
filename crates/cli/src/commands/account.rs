//! Account management commands

use anyhow::Result;
use paybank_business::AccountService;
use paybank_core::{Account, Currency};

use crate::config::require_actor;
use crate::db::Session;
use crate::AccountAction;

pub async fn handle(session: &Session, actor: Option<&str>, action: AccountAction) -> Result<()> {
    let service = AccountService::new(&session.ctx);

    match action {
        AccountAction::Open {
            currency,
            credit_limit,
        } => {
            let account = service
                .open_account(require_actor(actor)?, Currency::new(&currency), credit_limit)
                .await?;
            println!("✅ Account opened");
            print_account(&account);
        }
        AccountAction::List => {
            let accounts = service.accounts_for_user(require_actor(actor)?).await?;
            if accounts.is_empty() {
                println!("No accounts");
            }
            for account in &accounts {
                print_account(account);
            }
        }
        AccountAction::Show { account_id } => {
            print_account(&service.get_account(&account_id).await?);
        }
        AccountAction::Disable { account_id } => {
            service
                .disable_account(require_actor(actor)?, &account_id)
                .await?;
            println!("✅ Account {} disabled", account_id);
        }
        AccountAction::Default { account_id } => {
            service
                .set_default_account(require_actor(actor)?, &account_id)
                .await?;
            println!("✅ Default account set to {}", account_id);
        }
    }
    Ok(())
}

fn print_account(account: &Account) {
    println!("  ID:           {}", account.id);
    println!("  Owner:        {}", account.owner_id);
    println!("  IBAN:         {}", account.iban);
    println!("  Balance:      {} {}", account.balance(), account.currency);
    println!("  Credit limit: {}", account.credit_limit);
    if account.disabled {
        println!("  Status:       disabled");
    }
}
