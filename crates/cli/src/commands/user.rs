//! User directory commands

use anyhow::Result;
use paybank_business::AccountService;

use crate::config::require_actor;
use crate::db::Session;
use crate::UserAction;

pub async fn handle(session: &Session, actor: Option<&str>, action: UserAction) -> Result<()> {
    let service = AccountService::new(&session.ctx);

    match action {
        UserAction::Add { user_id, name } => {
            let user = service.register_user(&user_id, &name).await?;
            println!("✅ User {} ({}) registered", user.id, user.name);
        }
        UserAction::Befriend { friend } => {
            let actor = require_actor(actor)?;
            service.add_friend(actor, &friend).await?;
            println!("✅ {} now lists {} as a friend", actor, friend);
        }
        UserAction::Show { user_id } => {
            let user = service.get_user(&user_id).await?;
            println!("👤 {} ({})", user.name, user.id);
            for account in service.accounts_for_user(&user.id).await? {
                let marker = if user.default_account_id.as_deref() == Some(account.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "  {} {}  {}  {} {}{}",
                    marker,
                    account.id,
                    account.iban,
                    account.balance(),
                    account.currency,
                    if account.disabled { "  (disabled)" } else { "" }
                );
            }
        }
    }
    Ok(())
}
