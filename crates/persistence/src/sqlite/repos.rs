//! Repository implementations for SQLite
//!
//! Every function takes `&mut SqliteConnection`; pass `&mut *tx` to run it
//! inside a transaction, or a pooled connection for plain reads.

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::*;
use chrono::{DateTime, Utc};
use paybank_core::{Account, MemberStatus, Party, PartyMember, Transfer, TransferRequest, User};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

fn collect<R, T>(rows: Vec<R>) -> PersistenceResult<Vec<T>>
where
    T: TryFrom<R, Error = PersistenceError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ============================================================================
// User Repository
// ============================================================================

/// Repository for the users and friendships tables
pub struct UserRepo;

impl UserRepo {
    pub async fn insert(conn: &mut SqliteConnection, user: &User) -> PersistenceResult<()> {
        sqlx::query(
            "INSERT INTO users (id, name, default_account_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.default_account_id)
        .bind(user.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn find(conn: &mut SqliteConnection, id: &str) -> PersistenceResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(User::from))
    }

    pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> PersistenceResult<User> {
        Self::find(conn, id)
            .await?
            .ok_or_else(|| PersistenceError::not_found("User", id))
    }

    pub async fn get_all(conn: &mut SqliteConnection) -> PersistenceResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY created_at")
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    pub async fn set_default_account(
        conn: &mut SqliteConnection,
        user_id: &str,
        account_id: Option<&str>,
    ) -> PersistenceResult<()> {
        let result = sqlx::query("UPDATE users SET default_account_id = ? WHERE id = ?")
            .bind(account_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("User", user_id));
        }
        Ok(())
    }

    /// Add the directed edge `user -> friend`.
    pub async fn add_friend(
        conn: &mut SqliteConnection,
        user_id: &str,
        friend_id: &str,
    ) -> PersistenceResult<()> {
        sqlx::query("INSERT OR IGNORE INTO friendships (user_id, friend_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(friend_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn are_mutual_friends(
        conn: &mut SqliteConnection,
        a: &str,
        b: &str,
    ) -> PersistenceResult<bool> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM friendships f
            JOIN friendships r ON r.user_id = f.friend_id AND r.friend_id = f.user_id
            WHERE f.user_id = ? AND f.friend_id = ?
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row.0 > 0)
    }
}

// ============================================================================
// Account Repository
// ============================================================================

/// Repository for the accounts table
pub struct AccountRepo;

impl AccountRepo {
    pub async fn insert(conn: &mut SqliteConnection, account: &Account) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, owner_id, currency, balance, credit_limit, iban, disabled, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.owner_id)
        .bind(account.currency.code())
        .bind(account.balance().to_string())
        .bind(account.credit_limit.to_string())
        .bind(&account.iban)
        .bind(account.disabled)
        .bind(account.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn find(conn: &mut SqliteConnection, id: &str) -> PersistenceResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        row.map(Account::try_from).transpose()
    }

    pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> PersistenceResult<Account> {
        Self::find(conn, id)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Account", id))
    }

    pub async fn find_by_iban(
        conn: &mut SqliteConnection,
        iban: &str,
    ) -> PersistenceResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE iban = ?")
            .bind(iban.trim().to_uppercase())
            .fetch_optional(&mut *conn)
            .await?;
        row.map(Account::try_from).transpose()
    }

    pub async fn get_by_owner(
        conn: &mut SqliteConnection,
        owner_id: &str,
    ) -> PersistenceResult<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT * FROM accounts WHERE owner_id = ? ORDER BY created_at",
        )
        .bind(owner_id)
        .fetch_all(&mut *conn)
        .await?;
        collect(rows)
    }

    /// Persist a balance produced by the ledger primitives.
    ///
    /// Only applies when the stored balance still equals `previous`.
    pub async fn update_balance(
        conn: &mut SqliteConnection,
        account: &Account,
        previous: Decimal,
    ) -> PersistenceResult<()> {
        let result = sqlx::query("UPDATE accounts SET balance = ? WHERE id = ? AND balance = ?")
            .bind(account.balance().to_string())
            .bind(&account.id)
            .bind(previous.to_string())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::conflict("Account", &account.id));
        }
        Ok(())
    }

    pub async fn set_disabled(
        conn: &mut SqliteConnection,
        id: &str,
        disabled: bool,
    ) -> PersistenceResult<()> {
        let result = sqlx::query("UPDATE accounts SET disabled = ? WHERE id = ?")
            .bind(disabled)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Account", id));
        }
        Ok(())
    }

    pub async fn get_all(conn: &mut SqliteConnection) -> PersistenceResult<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts ORDER BY created_at")
            .fetch_all(&mut *conn)
            .await?;
        collect(rows)
    }
}

// ============================================================================
// Transfer Repository
// ============================================================================

/// Repository for the transfers table. Insert-only.
pub struct TransferRepo;

impl TransferRepo {
    pub async fn insert(conn: &mut SqliteConnection, transfer: &Transfer) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transfers (
                id, source_account_id, recipient_account_id, sender_name, sender_iban,
                recipient_name, recipient_iban, amount, currency, exchanged_amount, note, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transfer.id)
        .bind(&transfer.source_account_id)
        .bind(&transfer.recipient_account_id)
        .bind(&transfer.sender_name)
        .bind(&transfer.sender_iban)
        .bind(&transfer.recipient_name)
        .bind(&transfer.recipient_iban)
        .bind(transfer.amount.to_string())
        .bind(transfer.currency.code())
        .bind(transfer.exchanged_amount.map(|a| a.to_string()))
        .bind(&transfer.note)
        .bind(transfer.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> PersistenceResult<Transfer> {
        let row = sqlx::query_as::<_, TransferRow>("SELECT * FROM transfers WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Transfer", id))?;
        Transfer::try_from(row)
    }

    /// Transfers in either direction for an account, newest first.
    pub async fn get_by_account(
        conn: &mut SqliteConnection,
        account_id: &str,
    ) -> PersistenceResult<Vec<Transfer>> {
        let rows = sqlx::query_as::<_, TransferRow>(
            r#"
            SELECT * FROM transfers
            WHERE source_account_id = ? OR recipient_account_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(account_id)
        .bind(account_id)
        .fetch_all(&mut *conn)
        .await?;
        collect(rows)
    }

    /// Transfers for an account with `from <= created_at < to`, newest first.
    pub async fn get_by_account_between(
        conn: &mut SqliteConnection,
        account_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PersistenceResult<Vec<Transfer>> {
        let mut transfers = Self::get_by_account(conn, account_id).await?;
        transfers.retain(|t| t.created_at >= from && t.created_at < to);
        Ok(transfers)
    }

    pub async fn count(conn: &mut SqliteConnection) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transfers")
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Transfer Request Repository
// ============================================================================

/// Repository for the transfer_requests table
pub struct RequestRepo;

impl RequestRepo {
    pub async fn insert(
        conn: &mut SqliteConnection,
        request: &TransferRequest,
    ) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transfer_requests (
                id, source_user_id, source_account_id, target_user_id, kind, amount, currency,
                note, party_id, status, created_at, resolved_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(&request.source_user_id)
        .bind(&request.source_account_id)
        .bind(&request.target_user_id)
        .bind(request.kind.as_str())
        .bind(request.amount.to_string())
        .bind(request.currency.code())
        .bind(&request.note)
        .bind(&request.party_id)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .bind(request.resolved_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get_by_id(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> PersistenceResult<TransferRequest> {
        let row = sqlx::query_as::<_, TransferRequestRow>(
            "SELECT * FROM transfer_requests WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| PersistenceError::not_found("TransferRequest", id))?;
        TransferRequest::try_from(row)
    }

    /// Write the resolved status. Only a pending row can be resolved.
    pub async fn resolve(
        conn: &mut SqliteConnection,
        request: &TransferRequest,
    ) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE transfer_requests SET status = ?, resolved_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(request.status.as_str())
        .bind(request.resolved_at)
        .bind(&request.id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::conflict("TransferRequest", &request.id));
        }
        Ok(())
    }

    /// Pending requests in either direction for a user, newest first.
    pub async fn get_pending_for_user(
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> PersistenceResult<Vec<TransferRequest>> {
        let rows = sqlx::query_as::<_, TransferRequestRow>(
            r#"
            SELECT * FROM transfer_requests
            WHERE (source_user_id = ? OR target_user_id = ?) AND status = 'pending'
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        collect(rows)
    }

    pub async fn get_by_party(
        conn: &mut SqliteConnection,
        party_id: &str,
    ) -> PersistenceResult<Vec<TransferRequest>> {
        let rows = sqlx::query_as::<_, TransferRequestRow>(
            "SELECT * FROM transfer_requests WHERE party_id = ? ORDER BY created_at",
        )
        .bind(party_id)
        .fetch_all(&mut *conn)
        .await?;
        collect(rows)
    }

    pub async fn count(conn: &mut SqliteConnection) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transfer_requests")
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Party Repositories
// ============================================================================

/// Repository for the parties table
pub struct PartyRepo;

impl PartyRepo {
    pub async fn insert(conn: &mut SqliteConnection, party: &Party) -> PersistenceResult<()> {
        sqlx::query(
            r#"
            INSERT INTO parties (id, host_account_id, host_user_id, total, note, completed, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&party.id)
        .bind(&party.host_account_id)
        .bind(&party.host_user_id)
        .bind(party.total.to_string())
        .bind(&party.note)
        .bind(party.completed)
        .bind(party.created_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get_by_id(conn: &mut SqliteConnection, id: &str) -> PersistenceResult<Party> {
        let row = sqlx::query_as::<_, PartyRow>("SELECT * FROM parties WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Party", id))?;
        Party::try_from(row)
    }

    /// Flip `completed` to true. Returns false when it already was.
    pub async fn mark_completed(conn: &mut SqliteConnection, id: &str) -> PersistenceResult<bool> {
        let result = sqlx::query("UPDATE parties SET completed = 1 WHERE id = ? AND completed = 0")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Parties the user hosts or belongs to, newest first.
    pub async fn get_for_user(
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> PersistenceResult<Vec<Party>> {
        let rows = sqlx::query_as::<_, PartyRow>(
            r#"
            SELECT DISTINCT p.* FROM parties p
            LEFT JOIN party_members m ON m.party_id = p.id
            WHERE p.host_user_id = ? OR m.user_id = ?
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        collect(rows)
    }

    pub async fn count(conn: &mut SqliteConnection) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM parties")
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.0)
    }
}

/// Repository for the party_members table
pub struct PartyMemberRepo;

impl PartyMemberRepo {
    pub async fn insert(
        conn: &mut SqliteConnection,
        member: &PartyMember,
    ) -> PersistenceResult<()> {
        sqlx::query(
            "INSERT INTO party_members (id, party_id, user_id, amount, request_id, status) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&member.id)
        .bind(&member.party_id)
        .bind(&member.user_id)
        .bind(member.amount.to_string())
        .bind(&member.request_id)
        .bind(member.status.as_str())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn get_by_party(
        conn: &mut SqliteConnection,
        party_id: &str,
    ) -> PersistenceResult<Vec<PartyMember>> {
        let rows = sqlx::query_as::<_, PartyMemberRow>(
            "SELECT * FROM party_members WHERE party_id = ? ORDER BY rowid",
        )
        .bind(party_id)
        .fetch_all(&mut *conn)
        .await?;
        collect(rows)
    }

    pub async fn find_by_request(
        conn: &mut SqliteConnection,
        request_id: &str,
    ) -> PersistenceResult<Option<PartyMember>> {
        let row = sqlx::query_as::<_, PartyMemberRow>(
            "SELECT * FROM party_members WHERE request_id = ?",
        )
        .bind(request_id)
        .fetch_optional(&mut *conn)
        .await?;
        row.map(PartyMember::try_from).transpose()
    }

    pub async fn update_status(
        conn: &mut SqliteConnection,
        member_id: &str,
        status: MemberStatus,
    ) -> PersistenceResult<()> {
        let result = sqlx::query("UPDATE party_members SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(member_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("PartyMember", member_id));
        }
        Ok(())
    }

    pub async fn count(conn: &mut SqliteConnection) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM party_members")
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Database initialization
// ============================================================================

/// Open (and create if missing) a file-backed pool.
pub async fn create_pool(database_url: &str) -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    Ok(pool)
}

/// Single-connection in-memory pool. The connection never expires, so the
/// database lives as long as the pool.
pub async fn create_pool_in_memory() -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Run migrations
pub async fn run_migrations(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}
