//! Money movement commands: deposit, transfer, pay, send

use anyhow::Result;
use paybank_business::{RequestService, SendOutcome, TransferService};
use paybank_core::Transfer;
use rust_decimal::Decimal;

use crate::db::Session;

pub async fn deposit(
    session: &Session,
    account_id: &str,
    amount: Decimal,
    from_name: &str,
    from_iban: &str,
    note: &str,
) -> Result<()> {
    let transfer = TransferService::new(&session.ctx)
        .receive_external(account_id, from_name, from_iban, amount, note)
        .await?;
    print_transfer(&transfer);
    Ok(())
}

pub async fn transfer(
    session: &Session,
    actor: &str,
    from_account: &str,
    to_account: &str,
    amount: Decimal,
    note: &str,
) -> Result<()> {
    let transfer = TransferService::new(&session.ctx)
        .transfer(actor, from_account, to_account, amount, note)
        .await?;
    print_transfer(&transfer);
    Ok(())
}

pub async fn pay(
    session: &Session,
    actor: &str,
    from_account: &str,
    iban: &str,
    name: &str,
    amount: Decimal,
    note: &str,
) -> Result<()> {
    let transfer = TransferService::new(&session.ctx)
        .transfer_to_iban(actor, from_account, iban, name, amount, note)
        .await?;
    print_transfer(&transfer);
    Ok(())
}

pub async fn send(
    session: &Session,
    actor: &str,
    from_account: &str,
    to_user: &str,
    amount: Decimal,
    note: &str,
) -> Result<()> {
    match RequestService::new(&session.ctx)
        .send_money(actor, from_account, to_user, amount, note)
        .await?
    {
        SendOutcome::Transferred(transfer) => print_transfer(&transfer),
        SendOutcome::Requested(request) => {
            println!("📨 {} is not reachable directly, request {} created", to_user, request.id);
        }
    }
    Ok(())
}

pub(crate) fn print_transfer(transfer: &Transfer) {
    println!("✅ Transfer {}", transfer.id);
    println!(
        "   {} ({}) -> {} ({})",
        transfer.sender_name, transfer.sender_iban, transfer.recipient_name, transfer.recipient_iban
    );
    match transfer.exchanged_amount {
        Some(exchanged) => println!(
            "   {} {} (credited {})",
            transfer.amount, transfer.currency, exchanged
        ),
        None => println!("   {} {}", transfer.amount, transfer.currency),
    }
}
