//! Party settlement
//!
//! A party fans out one pending request per member. Members settle through
//! the request protocol; the party completes once every member is resolved.

use crate::context::ServiceContext;
use crate::error::{or_missing, BusinessError, BusinessResult};
use crate::notify::PushEvent;
use crate::request::insert_pending;
use crate::transfer::{ensure_enabled, ensure_owner, load_account};
use paybank_core::{
    CoreError, Event, EventKind, MemberStatus, Party, PartyMember, PartyShare, RequestKind,
    RequestStatus, TransferRequest,
};
use paybank_persistence::{PartyMemberRepo, PartyRepo, RequestRepo, UserRepo};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::{debug, info};

/// Party with its members
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartyDetails {
    pub party: Party,
    pub members: Vec<PartyMember>,
}

impl PartyDetails {
    pub fn pending_members(&self) -> impl Iterator<Item = &PartyMember> {
        self.members.iter().filter(|m| !m.status.is_resolved())
    }
}

/// A party whose `completed` flag was flipped by the current transaction
#[derive(Debug, Clone)]
pub(crate) struct PartyCompletion {
    pub party: Party,
}

pub(crate) async fn load_party(
    conn: &mut SqliteConnection,
    party_id: &str,
) -> BusinessResult<Party> {
    PartyRepo::get_by_id(conn, party_id)
        .await
        .map_err(|e| or_missing(e, || BusinessError::PartyNotFound(party_id.to_string())))
}

/// Re-evaluate completion. Only ever sets the flag.
async fn refresh_completion(
    conn: &mut SqliteConnection,
    mut party: Party,
) -> BusinessResult<Option<PartyCompletion>> {
    let members = PartyMemberRepo::get_by_party(conn, &party.id).await?;
    if party.refresh_completion(&members) && PartyRepo::mark_completed(conn, &party.id).await? {
        return Ok(Some(PartyCompletion { party }));
    }
    Ok(None)
}

/// Mirror a resolved request onto its party member, then re-check completion.
///
/// No-op for requests outside a party.
pub(crate) async fn settle_member(
    conn: &mut SqliteConnection,
    request: &TransferRequest,
) -> BusinessResult<Option<PartyCompletion>> {
    let Some(party_id) = request.party_id.as_deref() else {
        return Ok(None);
    };

    let member = PartyMemberRepo::find_by_request(conn, &request.id)
        .await?
        .ok_or_else(|| {
            BusinessError::Integrity(format!(
                "Request {} of party {} has no member",
                request.id, party_id
            ))
        })?;
    PartyMemberRepo::update_status(conn, &member.id, MemberStatus::from_request(request.status))
        .await?;

    let party = load_party(conn, party_id).await?;
    refresh_completion(conn, party).await
}

pub(crate) fn notify_completed(ctx: &ServiceContext, actor_id: &str, party: &Party) {
    info!(party_id = %party.id, "Party completed");
    ctx.record(|id| Event::party(id, EventKind::PartyCompleted, actor_id, party));
    ctx.push(
        &party.host_user_id,
        PushEvent::PartyCompleted {
            party_id: party.id.clone(),
        },
    );
}

fn invalid_party(err: CoreError) -> BusinessError {
    match err {
        CoreError::ValidationError(msg) | CoreError::InvalidAmount(msg) => {
            BusinessError::InvalidParty(msg)
        }
        other => other.into(),
    }
}

/// Party Service - create, cancel, inspect
pub struct PartyService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PartyService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a party and one pending request per member, all or nothing.
    ///
    /// Member amounts are signed like requests: positive sends money to the
    /// member, negative asks the member to pay the host.
    pub async fn create(
        &self,
        actor_id: &str,
        note: &str,
        host_account_id: &str,
        shares: &[PartyShare],
    ) -> BusinessResult<Party> {
        let mut tx = self.ctx.begin().await?;

        let host_account = load_account(&mut tx, host_account_id).await?;
        ensure_owner(actor_id, &host_account, "host a party from this account")?;
        ensure_enabled(&host_account)?;

        let party =
            Party::new(actor_id, &host_account.id, note, shares).map_err(invalid_party)?;
        PartyRepo::insert(&mut tx, &party).await?;

        for share in shares {
            if UserRepo::find(&mut tx, &share.user_id).await?.is_none() {
                return Err(BusinessError::UnknownUser(share.user_id.clone()));
            }
            let (kind, magnitude) = RequestKind::from_signed(share.amount).ok_or_else(|| {
                BusinessError::InvalidParty(format!("Share of {} must not be zero", share.user_id))
            })?;

            let request = insert_pending(
                &mut tx,
                &host_account,
                &share.user_id,
                kind,
                magnitude,
                note,
                Some(&party.id),
            )
            .await?;

            let mut member = PartyMember::new(&party.id, share);
            member.request_id = Some(request.id);
            PartyMemberRepo::insert(&mut tx, &member).await?;
        }

        tx.commit().await?;

        info!(
            party_id = %party.id,
            total = %party.total,
            members = shares.len(),
            "Party created"
        );
        self.ctx
            .record(|id| Event::party(id, EventKind::PartyCreated, actor_id, &party));
        for share in shares {
            self.ctx.push(
                &share.user_id,
                PushEvent::PartyInvite {
                    party_id: party.id.clone(),
                    host_user_id: actor_id.to_string(),
                    amount: share.amount,
                },
            );
        }
        Ok(party)
    }

    /// Decline every pending member request. Host only.
    ///
    /// Returns false when there was nothing left to cancel. Accepted member
    /// transfers stay as they are.
    pub async fn cancel(&self, actor_id: &str, party_id: &str) -> BusinessResult<bool> {
        let mut tx = self.ctx.begin().await?;

        let party = load_party(&mut tx, party_id).await?;
        if party.host_user_id != actor_id {
            return Err(BusinessError::not_permitted(actor_id, "cancel this party"));
        }
        if party.completed {
            debug!(party_id, "Party already completed, nothing to cancel");
            return Ok(false);
        }

        let mut declined = Vec::new();
        for mut request in RequestRepo::get_by_party(&mut tx, party_id).await? {
            if !request.is_pending() {
                continue;
            }
            request.resolve(RequestStatus::Declined)?;
            RequestRepo::resolve(&mut tx, &request).await?;
            if let Some(member) = PartyMemberRepo::find_by_request(&mut tx, &request.id).await? {
                PartyMemberRepo::update_status(&mut tx, &member.id, MemberStatus::Declined)
                    .await?;
            }
            declined.push(request);
        }

        let completion = refresh_completion(&mut tx, party).await?;
        tx.commit().await?;

        if declined.is_empty() {
            debug!(party_id, "No pending member left");
            return Ok(false);
        }

        info!(party_id, declined = declined.len(), "Party cancelled");
        self.ctx.record(|id| {
            Event::new(id, EventKind::PartyCancelled, actor_id, party_id)
                .with_description(&format!("{} member request(s) declined", declined.len()))
        });
        for request in &declined {
            self.ctx
                .record(|id| Event::request(id, EventKind::RequestDeclined, actor_id, request));
            self.ctx.push(
                &request.target_user_id,
                PushEvent::RequestDeclined {
                    request_id: request.id.clone(),
                },
            );
        }
        if let Some(completion) = completion {
            info!(party_id = %completion.party.id, "Party closed by cancellation");
        }
        Ok(true)
    }

    /// Load a party with its members, checking the stored total.
    pub async fn get(&self, party_id: &str) -> BusinessResult<PartyDetails> {
        let mut conn = self.ctx.pool().acquire().await?;
        let party = load_party(&mut conn, party_id).await?;
        let members = PartyMemberRepo::get_by_party(&mut conn, party_id).await?;

        party
            .verify_total(&members)
            .map_err(|e| BusinessError::Integrity(e.to_string()))?;

        Ok(PartyDetails { party, members })
    }

    /// Parties the user hosts or belongs to, newest first.
    pub async fn for_user(&self, user_id: &str) -> BusinessResult<Vec<PartyDetails>> {
        let mut conn = self.ctx.pool().acquire().await?;
        let parties = PartyRepo::get_for_user(&mut conn, user_id).await?;

        let mut details = Vec::with_capacity(parties.len());
        for party in parties {
            let members = PartyMemberRepo::get_by_party(&mut conn, &party.id).await?;
            party
                .verify_total(&members)
                .map_err(|e| BusinessError::Integrity(e.to_string()))?;
            details.push(PartyDetails { party, members });
        }
        debug!(user_id, count = details.len(), "Loaded parties");
        Ok(details)
    }
}
