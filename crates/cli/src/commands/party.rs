//! Party commands

use anyhow::Result;
use paybank_business::PartyService;

use crate::commands::print_json;
use crate::db::Session;
use crate::PartyAction;

pub async fn handle(session: &Session, actor: &str, action: PartyAction) -> Result<()> {
    let service = PartyService::new(&session.ctx);

    match action {
        PartyAction::Create {
            host_account,
            note,
            members,
        } => {
            let party = service.create(actor, &note, &host_account, &members).await?;
            println!(
                "🎉 Party {} created: {} members, total {}",
                party.id,
                members.len(),
                party.total
            );
        }
        PartyAction::Cancel { party_id } => {
            if service.cancel(actor, &party_id).await? {
                println!("✅ Party {} cancelled", party_id);
            } else {
                println!("Nothing left to cancel in party {}", party_id);
            }
        }
        PartyAction::Show { party_id } => {
            print_json(&service.get(&party_id).await?)?;
        }
    }
    Ok(())
}
