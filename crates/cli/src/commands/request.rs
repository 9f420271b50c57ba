//! Transfer request commands

use anyhow::{bail, Result};
use paybank_business::{AcceptOutcome, RequestService};
use paybank_core::{RequestKind, TransferRequest};

use crate::commands::money::print_transfer;
use crate::db::Session;
use crate::RequestAction;

pub async fn handle(session: &Session, actor: &str, action: RequestAction) -> Result<()> {
    let service = RequestService::new(&session.ctx);

    match action {
        RequestAction::Create {
            from_account,
            to_user,
            amount,
            note,
        } => {
            let Some((kind, magnitude)) = RequestKind::from_signed(amount) else {
                bail!("A request amount cannot be zero");
            };
            let request = service
                .create(actor, &from_account, &to_user, kind, magnitude, &note)
                .await?;
            println!("📨 Request created");
            print_request(&request);
        }
        RequestAction::Accept {
            request_id,
            account_id,
        } => match service.accept(actor, &request_id, &account_id).await? {
            AcceptOutcome::Accepted(transfer) => print_transfer(&transfer),
            AcceptOutcome::BalanceLow => {
                println!("⚠️  balance_low: request {} is still pending", request_id);
            }
        },
        RequestAction::Decline { request_id } => {
            service.decline(actor, &request_id).await?;
            println!("✅ Request {} declined", request_id);
        }
        RequestAction::Cancel { request_id } => {
            service.cancel(actor, &request_id).await?;
            println!("✅ Request {} cancelled", request_id);
        }
        RequestAction::List => {
            let requests = service.pending_for_user(actor).await?;
            if requests.is_empty() {
                println!("No pending requests");
            }
            for request in &requests {
                print_request(request);
            }
        }
    }
    Ok(())
}

fn print_request(request: &TransferRequest) {
    println!(
        "  {}  {} -> {}  {} {} {}  [{}]",
        request.id,
        request.source_user_id,
        request.target_user_id,
        request.kind,
        request.amount,
        request.currency,
        request.status
    );
}
