//! Transfer executor
//!
//! Moves money between accounts inside one database transaction. The
//! in-transaction core ([`execute`]) is shared with request acceptance and
//! the send fast path.

use crate::context::ServiceContext;
use crate::error::{or_missing, BusinessError, BusinessResult};
use crate::notify::PushEvent;
use paybank_core::{Account, Counterparty, Event, ExchangeTable, Transfer};
use paybank_persistence::{AccountRepo, TransferRepo, UserRepo};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use tracing::info;

/// Actor id recorded for money arriving from outside the bank
pub const EXTERNAL_ACTOR: &str = "external";

/// How the executor treats the currency pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExchangeMode {
    SameCurrency,
    Exchanging,
    /// Pick by comparing the two currencies
    Auto,
}

pub(crate) async fn load_account(
    conn: &mut SqliteConnection,
    account_id: &str,
) -> BusinessResult<Account> {
    AccountRepo::get_by_id(conn, account_id)
        .await
        .map_err(|e| or_missing(e, || BusinessError::UnknownAccount(account_id.to_string())))
}

pub(crate) fn ensure_enabled(account: &Account) -> BusinessResult<()> {
    if account.disabled {
        return Err(BusinessError::AccountDisabled(account.id.clone()));
    }
    Ok(())
}

pub(crate) fn ensure_owner(
    actor_id: &str,
    account: &Account,
    operation: &str,
) -> BusinessResult<()> {
    if !account.is_owned_by(actor_id) {
        return Err(BusinessError::not_permitted(actor_id, operation));
    }
    Ok(())
}

/// Display name for the owner of an account; falls back to the user id.
pub(crate) async fn owner_name(
    conn: &mut SqliteConnection,
    account: &Account,
) -> BusinessResult<String> {
    Ok(UserRepo::find(conn, &account.owner_id)
        .await?
        .map(|u| u.name)
        .unwrap_or_else(|| account.owner_id.clone()))
}

/// Persist a balance change made by the ledger primitives.
async fn write_balance(
    conn: &mut SqliteConnection,
    account: &Account,
    previous: Decimal,
) -> BusinessResult<()> {
    AccountRepo::update_balance(conn, account, previous).await?;
    Ok(())
}

/// Debit `source`, credit `target`, record the transfer.
///
/// `amount` is in the source currency. On error nothing was written that the
/// caller's transaction would keep once it is dropped.
pub(crate) async fn execute(
    conn: &mut SqliteConnection,
    exchange: &ExchangeTable,
    source: &mut Account,
    target: &mut Account,
    amount: Decimal,
    note: &str,
    mode: ExchangeMode,
) -> BusinessResult<Transfer> {
    if amount <= Decimal::ZERO {
        return Err(BusinessError::InvalidAmount(format!(
            "Transfer amount must be positive: {}",
            amount
        )));
    }
    if source.id == target.id {
        return Err(BusinessError::InvalidAmount(
            "Source and target accounts must differ".to_string(),
        ));
    }
    ensure_enabled(source)?;
    ensure_enabled(target)?;

    let same = source.currency == target.currency;
    match mode {
        ExchangeMode::SameCurrency if !same => {
            return Err(BusinessError::CurrencyMismatch {
                expected: source.currency.to_string(),
                actual: target.currency.to_string(),
            });
        }
        ExchangeMode::Exchanging if same => {
            return Err(BusinessError::CurrencyMismatch {
                expected: format!("a currency other than {}", source.currency),
                actual: target.currency.to_string(),
            });
        }
        _ => {}
    }

    // Rate resolved once, here
    let rate = if same {
        None
    } else {
        Some(
            exchange
                .rate(&source.currency, &target.currency)
                .ok_or_else(|| {
                    BusinessError::rate_unavailable(source.currency.code(), target.currency.code())
                })?,
        )
    };

    let source_before = source.balance();
    source.debit(amount)?;
    let exchanged_amount = match rate {
        Some(rate) => Some(amount.checked_mul(rate).ok_or_else(|| {
            BusinessError::InvalidAmount(format!(
                "Exchanged amount out of range: {} x {}",
                amount, rate
            ))
        })?),
        None => None,
    };
    let target_before = target.balance();
    target.credit(exchanged_amount.unwrap_or(amount))?;

    write_balance(conn, source, source_before).await?;
    write_balance(conn, target, target_before).await?;

    let sender = Counterparty::internal(source, &owner_name(conn, source).await?);
    let recipient = Counterparty::internal(target, &owner_name(conn, target).await?);
    let transfer = Transfer::new(
        sender,
        recipient,
        amount,
        source.currency.clone(),
        exchanged_amount,
        note,
    );
    TransferRepo::insert(conn, &transfer).await?;

    Ok(transfer)
}

/// Transfer Service - account-to-account and IBAN transfers
pub struct TransferService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> TransferService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Same-currency transfer. Fails with `CurrencyMismatch` otherwise.
    pub async fn transfer_same_currency(
        &self,
        actor_id: &str,
        source_account_id: &str,
        target_account_id: &str,
        amount: Decimal,
        note: &str,
    ) -> BusinessResult<Transfer> {
        self.run(
            actor_id,
            source_account_id,
            target_account_id,
            amount,
            note,
            ExchangeMode::SameCurrency,
        )
        .await
    }

    /// Cross-currency transfer at the current table rate.
    pub async fn transfer_exchanging(
        &self,
        actor_id: &str,
        source_account_id: &str,
        target_account_id: &str,
        amount: Decimal,
        note: &str,
    ) -> BusinessResult<Transfer> {
        self.run(
            actor_id,
            source_account_id,
            target_account_id,
            amount,
            note,
            ExchangeMode::Exchanging,
        )
        .await
    }

    /// Same-currency or exchanging, whichever the pair requires.
    pub async fn transfer(
        &self,
        actor_id: &str,
        source_account_id: &str,
        target_account_id: &str,
        amount: Decimal,
        note: &str,
    ) -> BusinessResult<Transfer> {
        self.run(
            actor_id,
            source_account_id,
            target_account_id,
            amount,
            note,
            ExchangeMode::Auto,
        )
        .await
    }

    async fn run(
        &self,
        actor_id: &str,
        source_account_id: &str,
        target_account_id: &str,
        amount: Decimal,
        note: &str,
        mode: ExchangeMode,
    ) -> BusinessResult<Transfer> {
        let mut tx = self.ctx.begin().await?;

        let mut source = load_account(&mut tx, source_account_id).await?;
        ensure_owner(actor_id, &source, "send from this account")?;
        let mut target = load_account(&mut tx, target_account_id).await?;

        let transfer = execute(
            &mut tx,
            self.ctx.exchange(),
            &mut source,
            &mut target,
            amount,
            note,
            mode,
        )
        .await?;

        tx.commit().await?;

        info!(
            transfer_id = %transfer.id,
            amount = %transfer.amount,
            currency = %transfer.currency,
            exchanged = ?transfer.exchanged_amount,
            "Transfer executed"
        );
        self.after_commit(actor_id, &transfer, Some(&target.owner_id));
        Ok(transfer)
    }

    /// Transfer to an IBAN. Managed IBANs behave like [`Self::transfer`];
    /// anything else only debits the source and snapshots the recipient.
    pub async fn transfer_to_iban(
        &self,
        actor_id: &str,
        source_account_id: &str,
        target_iban: &str,
        recipient_name: &str,
        amount: Decimal,
        note: &str,
    ) -> BusinessResult<Transfer> {
        if target_iban.trim().is_empty() {
            return Err(BusinessError::UnknownRecipient(target_iban.to_string()));
        }

        let mut tx = self.ctx.begin().await?;

        let mut source = load_account(&mut tx, source_account_id).await?;
        ensure_owner(actor_id, &source, "send from this account")?;

        let internal = AccountRepo::find_by_iban(&mut tx, target_iban).await?;
        let (transfer, recipient_user) = match internal {
            Some(mut target) => {
                let transfer = execute(
                    &mut tx,
                    self.ctx.exchange(),
                    &mut source,
                    &mut target,
                    amount,
                    note,
                    ExchangeMode::Auto,
                )
                .await?;
                (transfer, Some(target.owner_id))
            }
            None => {
                if amount <= Decimal::ZERO {
                    return Err(BusinessError::InvalidAmount(format!(
                        "Transfer amount must be positive: {}",
                        amount
                    )));
                }
                ensure_enabled(&source)?;

                let before = source.balance();
                source.debit(amount)?;
                write_balance(&mut tx, &source, before).await?;

                let sender = Counterparty::internal(&source, &owner_name(&mut tx, &source).await?);
                let transfer = Transfer::new(
                    sender,
                    Counterparty::external(recipient_name, target_iban),
                    amount,
                    source.currency.clone(),
                    None,
                    note,
                );
                TransferRepo::insert(&mut tx, &transfer).await?;
                (transfer, None)
            }
        };

        tx.commit().await?;

        info!(
            transfer_id = %transfer.id,
            iban = %transfer.recipient_iban,
            external = recipient_user.is_none(),
            "IBAN transfer executed"
        );
        self.after_commit(actor_id, &transfer, recipient_user.as_deref());
        Ok(transfer)
    }

    /// Incoming payment from outside the bank.
    pub async fn receive_external(
        &self,
        target_account_id: &str,
        sender_name: &str,
        sender_iban: &str,
        amount: Decimal,
        note: &str,
    ) -> BusinessResult<Transfer> {
        if amount <= Decimal::ZERO {
            return Err(BusinessError::InvalidAmount(format!(
                "Incoming amount must be positive: {}",
                amount
            )));
        }

        let mut tx = self.ctx.begin().await?;

        let mut target = load_account(&mut tx, target_account_id).await?;
        ensure_enabled(&target)?;

        let before = target.balance();
        target.credit(amount)?;
        write_balance(&mut tx, &target, before).await?;

        let recipient = Counterparty::internal(&target, &owner_name(&mut tx, &target).await?);
        let transfer = Transfer::new(
            Counterparty::external(sender_name, sender_iban),
            recipient,
            amount,
            target.currency.clone(),
            None,
            note,
        );
        TransferRepo::insert(&mut tx, &transfer).await?;

        tx.commit().await?;

        info!(transfer_id = %transfer.id, amount = %amount, "External payment received");
        self.after_commit(EXTERNAL_ACTOR, &transfer, Some(&target.owner_id));
        Ok(transfer)
    }

    fn after_commit(&self, actor_id: &str, transfer: &Transfer, recipient_user: Option<&str>) {
        self.ctx.record(|id| Event::transfer(id, actor_id, transfer));
        if let Some(user_id) = recipient_user {
            self.ctx.push(user_id, received_event(transfer));
        }
    }
}

pub(crate) fn received_event(transfer: &Transfer) -> PushEvent {
    PushEvent::TransferReceived {
        transfer_id: transfer.id.clone(),
        sender_name: transfer.sender_name.clone(),
        amount: transfer.amount,
        currency: transfer.currency.to_string(),
    }
}
