//! Transfer request protocol
//!
//! `Pending` requests are resolved exactly once: accepted (money moves),
//! declined by the target, or cancelled by the source. Accepting or
//! declining a party request also settles the party member.

use crate::context::ServiceContext;
use crate::error::{or_missing, BusinessError, BusinessResult};
use crate::notify::PushEvent;
use crate::party::{settle_member, PartyCompletion};
use crate::transfer::{
    ensure_enabled, ensure_owner, execute, load_account, received_event, ExchangeMode,
};
use paybank_core::{
    Account, Event, EventKind, RequestKind, RequestStatus, Transfer, TransferRequest,
};
use paybank_persistence::{AccountRepo, RequestRepo, UserRepo};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use tracing::{debug, info};

/// Result of accepting a request
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptOutcome {
    Accepted(Transfer),
    /// The paying side could not cover the amount; the request stays pending
    BalanceLow,
}

/// Result of [`RequestService::send_money`]
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Fast path: money already moved
    Transferred(Transfer),
    /// A `Send` request is waiting for the target
    Requested(TransferRequest),
}

/// Insert a pending request from `source`'s owner. Shared with party creation.
pub(crate) async fn insert_pending(
    conn: &mut SqliteConnection,
    source: &Account,
    target_user_id: &str,
    kind: RequestKind,
    amount: Decimal,
    note: &str,
    party_id: Option<&str>,
) -> BusinessResult<TransferRequest> {
    if source.owner_id == target_user_id {
        return Err(BusinessError::not_permitted(
            &source.owner_id,
            "send a request to themselves",
        ));
    }
    if UserRepo::find(conn, target_user_id).await?.is_none() {
        return Err(BusinessError::UnknownUser(target_user_id.to_string()));
    }

    let request = TransferRequest::new(
        &source.owner_id,
        &source.id,
        target_user_id,
        kind,
        amount,
        source.currency.clone(),
        note,
        party_id,
    )?;
    RequestRepo::insert(conn, &request).await?;
    Ok(request)
}

async fn load_request(
    conn: &mut SqliteConnection,
    request_id: &str,
) -> BusinessResult<TransferRequest> {
    RequestRepo::get_by_id(conn, request_id)
        .await
        .map_err(|e| or_missing(e, || BusinessError::RequestNotFound(request_id.to_string())))
}

fn ensure_pending(request: &TransferRequest) -> BusinessResult<()> {
    if !request.is_pending() {
        return Err(BusinessError::RequestNotPending {
            request_id: request.id.clone(),
            status: request.status.to_string(),
        });
    }
    Ok(())
}

/// Request Service - create / accept / decline / cancel, plus the send fast path
pub struct RequestService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RequestService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a pending request. No money moves.
    pub async fn create(
        &self,
        actor_id: &str,
        source_account_id: &str,
        target_user_id: &str,
        kind: RequestKind,
        amount: Decimal,
        note: &str,
    ) -> BusinessResult<TransferRequest> {
        let mut tx = self.ctx.begin().await?;

        let source = load_account(&mut tx, source_account_id).await?;
        ensure_owner(actor_id, &source, "request from this account")?;
        ensure_enabled(&source)?;

        let request =
            insert_pending(&mut tx, &source, target_user_id, kind, amount, note, None).await?;

        tx.commit().await?;

        info!(
            request_id = %request.id,
            kind = %request.kind,
            amount = %request.amount,
            target = %request.target_user_id,
            "Transfer request created"
        );
        self.notify_created(&request);
        Ok(request)
    }

    /// Accept as the target, paying from / receiving into `paying_account_id`.
    pub async fn accept(
        &self,
        actor_id: &str,
        request_id: &str,
        paying_account_id: &str,
    ) -> BusinessResult<AcceptOutcome> {
        let mut tx = self.ctx.begin().await?;

        let mut request = load_request(&mut tx, request_id).await?;
        if request.target_user_id != actor_id {
            return Err(BusinessError::not_permitted(actor_id, "accept this request"));
        }
        ensure_pending(&request)?;

        let paying = load_account(&mut tx, paying_account_id).await?;
        ensure_owner(actor_id, &paying, "accept with this account")?;
        let source = load_account(&mut tx, &request.source_account_id).await?;

        let (mut debited, mut credited) = match request.kind {
            RequestKind::Send => (source, paying),
            RequestKind::Request => (paying, source),
        };

        let transfer = match execute(
            &mut tx,
            self.ctx.exchange(),
            &mut debited,
            &mut credited,
            request.amount,
            &request.note,
            ExchangeMode::Auto,
        )
        .await
        {
            Ok(transfer) => transfer,
            Err(e) if e.is_insufficient_funds() => {
                // tx dropped here: nothing written, request stays pending
                info!(request_id, account = %debited.id, "Request accept refused: balance low");
                return Ok(AcceptOutcome::BalanceLow);
            }
            Err(e) => return Err(e),
        };

        request.resolve(RequestStatus::Accepted)?;
        RequestRepo::resolve(&mut tx, &request).await?;
        let completion = settle_member(&mut tx, &request).await?;

        tx.commit().await?;

        info!(
            request_id,
            transfer_id = %transfer.id,
            amount = %transfer.amount,
            "Transfer request accepted"
        );

        self.ctx
            .record(|id| Event::request(id, EventKind::RequestAccepted, actor_id, &request));
        self.ctx.record(|id| Event::transfer(id, actor_id, &transfer));
        self.ctx.push(
            &request.source_user_id,
            PushEvent::RequestAccepted {
                request_id: request.id.clone(),
            },
        );
        if credited.owner_id != actor_id {
            self.ctx.push(&credited.owner_id, received_event(&transfer));
        }
        self.after_completion(actor_id, completion);

        Ok(AcceptOutcome::Accepted(transfer))
    }

    /// Decline as the target. No money moves.
    pub async fn decline(
        &self,
        actor_id: &str,
        request_id: &str,
    ) -> BusinessResult<TransferRequest> {
        let (request, completion) = self
            .resolve_without_transfer(actor_id, request_id, RequestStatus::Declined)
            .await?;

        self.ctx
            .record(|id| Event::request(id, EventKind::RequestDeclined, actor_id, &request));
        self.ctx.push(
            &request.source_user_id,
            PushEvent::RequestDeclined {
                request_id: request.id.clone(),
            },
        );
        self.after_completion(actor_id, completion);
        Ok(request)
    }

    /// Withdraw as the source. No money moves.
    pub async fn cancel(
        &self,
        actor_id: &str,
        request_id: &str,
    ) -> BusinessResult<TransferRequest> {
        let (request, completion) = self
            .resolve_without_transfer(actor_id, request_id, RequestStatus::Cancelled)
            .await?;

        self.ctx
            .record(|id| Event::request(id, EventKind::RequestCancelled, actor_id, &request));
        self.ctx.push(
            &request.target_user_id,
            PushEvent::RequestCancelled {
                request_id: request.id.clone(),
            },
        );
        self.after_completion(actor_id, completion);
        Ok(request)
    }

    async fn resolve_without_transfer(
        &self,
        actor_id: &str,
        request_id: &str,
        status: RequestStatus,
    ) -> BusinessResult<(TransferRequest, Option<PartyCompletion>)> {
        let mut tx = self.ctx.begin().await?;

        let mut request = load_request(&mut tx, request_id).await?;
        let allowed = match status {
            RequestStatus::Cancelled => request.source_user_id == actor_id,
            _ => request.target_user_id == actor_id,
        };
        if !allowed {
            return Err(BusinessError::not_permitted(
                actor_id,
                &format!("mark this request {}", status),
            ));
        }
        ensure_pending(&request)?;

        request.resolve(status)?;
        RequestRepo::resolve(&mut tx, &request).await?;
        let completion = settle_member(&mut tx, &request).await?;

        tx.commit().await?;

        info!(request_id, status = %status, "Transfer request resolved");
        Ok((request, completion))
    }

    /// Pending requests the user sent or received, newest first.
    pub async fn pending_for_user(&self, user_id: &str) -> BusinessResult<Vec<TransferRequest>> {
        let mut conn = self.ctx.pool().acquire().await?;
        let requests = RequestRepo::get_pending_for_user(&mut conn, user_id).await?;
        debug!(user_id, count = requests.len(), "Loaded pending requests");
        Ok(requests)
    }

    pub async fn get(&self, request_id: &str) -> BusinessResult<TransferRequest> {
        let mut conn = self.ctx.pool().acquire().await?;
        load_request(&mut conn, request_id).await
    }

    /// Send money to a user.
    ///
    /// Mutual friends with an enabled default account that can receive the
    /// source currency get the money immediately; everyone else gets a
    /// pending `Send` request.
    pub async fn send_money(
        &self,
        actor_id: &str,
        source_account_id: &str,
        target_user_id: &str,
        amount: Decimal,
        note: &str,
    ) -> BusinessResult<SendOutcome> {
        let mut tx = self.ctx.begin().await?;

        let mut source = load_account(&mut tx, source_account_id).await?;
        ensure_owner(actor_id, &source, "send from this account")?;
        ensure_enabled(&source)?;

        let target_user = UserRepo::find(&mut tx, target_user_id)
            .await?
            .ok_or_else(|| BusinessError::UnknownUser(target_user_id.to_string()))?;
        if target_user.id == actor_id {
            return Err(BusinessError::not_permitted(actor_id, "send money to themselves"));
        }

        let mut fast_target = None;
        if UserRepo::are_mutual_friends(&mut tx, actor_id, &target_user.id).await? {
            if let Some(account_id) = &target_user.default_account_id {
                if let Some(account) = AccountRepo::find(&mut tx, account_id).await? {
                    let compatible = account.currency == source.currency
                        || self
                            .ctx
                            .exchange()
                            .rate(&source.currency, &account.currency)
                            .is_some();
                    if !account.disabled && compatible {
                        fast_target = Some(account);
                    }
                }
            }
        }

        let outcome = match fast_target {
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
                SendOutcome::Transferred(transfer)
            }
            None => {
                let request = insert_pending(
                    &mut tx,
                    &source,
                    &target_user.id,
                    RequestKind::Send,
                    amount,
                    note,
                    None,
                )
                .await?;
                SendOutcome::Requested(request)
            }
        };

        tx.commit().await?;

        match &outcome {
            SendOutcome::Transferred(transfer) => {
                info!(transfer_id = %transfer.id, target = %target_user.id, "Sent via fast path");
                self.ctx.record(|id| Event::transfer(id, actor_id, transfer));
                self.ctx.push(&target_user.id, received_event(transfer));
            }
            SendOutcome::Requested(request) => {
                info!(request_id = %request.id, target = %target_user.id, "Send queued as request");
                self.notify_created(request);
            }
        }
        Ok(outcome)
    }

    fn notify_created(&self, request: &TransferRequest) {
        self.ctx.record(|id| {
            Event::request(id, EventKind::RequestCreated, &request.source_user_id, request)
        });
        self.ctx.push(
            &request.target_user_id,
            PushEvent::RequestReceived {
                request_id: request.id.clone(),
                from_user_id: request.source_user_id.clone(),
                amount: request.signed_amount(),
                currency: request.currency.to_string(),
            },
        );
    }

    fn after_completion(&self, actor_id: &str, completion: Option<PartyCompletion>) {
        if let Some(completion) = completion {
            crate::party::notify_completed(self.ctx, actor_id, &completion.party);
        }
    }
}
