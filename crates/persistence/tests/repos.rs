//! Repository tests against a migrated in-memory database

use paybank_core::{
    Account, Counterparty, Currency, MemberStatus, Party, PartyMember, PartyShare, RequestKind,
    RequestStatus, Transfer, TransferRequest, User,
};
use paybank_persistence::{
    AccountRepo, Database, PartyMemberRepo, PartyRepo, RequestRepo, TransferRepo, UserRepo,
};
use rust_decimal_macros::dec;
use tempfile::TempDir;

async fn seed_user(db: &Database, id: &str) -> User {
    let user = User::new(id, id);
    let mut conn = db.pool().acquire().await.unwrap();
    UserRepo::insert(&mut conn, &user).await.unwrap();
    user
}

async fn seed_account(db: &Database, owner: &str, currency: Currency) -> Account {
    let account = Account::open(owner, currency, dec!(0)).unwrap();
    let mut conn = db.pool().acquire().await.unwrap();
    AccountRepo::insert(&mut conn, &account).await.unwrap();
    account
}

#[tokio::test]
async fn test_account_round_trip_and_guarded_balance() {
    let db = Database::in_memory().await.unwrap();
    seed_user(&db, "alice").await;
    let mut account = seed_account(&db, "alice", Currency::ron()).await;

    let mut conn = db.pool().acquire().await.unwrap();
    let loaded = AccountRepo::get_by_id(&mut conn, &account.id).await.unwrap();
    assert_eq!(loaded, account);

    let previous = account.balance();
    account.credit(dec!(45.5)).unwrap();
    AccountRepo::update_balance(&mut conn, &account, previous)
        .await
        .unwrap();

    let loaded = AccountRepo::get_by_id(&mut conn, &account.id).await.unwrap();
    assert_eq!(loaded.balance(), dec!(45.5));

    // Stale expectation: the stored balance is no longer 0
    let err = AccountRepo::update_balance(&mut conn, &account, dec!(0))
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_find_by_iban_normalizes() {
    let db = Database::in_memory().await.unwrap();
    seed_user(&db, "alice").await;
    let account = seed_account(&db, "alice", Currency::eur()).await;

    let mut conn = db.pool().acquire().await.unwrap();
    let query = format!("  {}  ", account.iban.to_lowercase());
    let found = AccountRepo::find_by_iban(&mut conn, &query).await.unwrap();
    assert_eq!(found.map(|a| a.id), Some(account.id));

    let missing = AccountRepo::find_by_iban(&mut conn, "RO00NOPE").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_get_missing_account_is_not_found() {
    let db = Database::in_memory().await.unwrap();
    let mut conn = db.pool().acquire().await.unwrap();
    let err = AccountRepo::get_by_id(&mut conn, "ACC_missing")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_mutual_friendship() {
    let db = Database::in_memory().await.unwrap();
    seed_user(&db, "alice").await;
    seed_user(&db, "bob").await;

    let mut conn = db.pool().acquire().await.unwrap();
    UserRepo::add_friend(&mut conn, "alice", "bob").await.unwrap();
    assert!(!UserRepo::are_mutual_friends(&mut conn, "alice", "bob")
        .await
        .unwrap());

    UserRepo::add_friend(&mut conn, "bob", "alice").await.unwrap();
    assert!(UserRepo::are_mutual_friends(&mut conn, "alice", "bob")
        .await
        .unwrap());
    assert!(UserRepo::are_mutual_friends(&mut conn, "bob", "alice")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_transfer_listing_and_rollback() {
    let db = Database::in_memory().await.unwrap();
    seed_user(&db, "alice").await;
    seed_user(&db, "bob").await;
    let a = seed_account(&db, "alice", Currency::ron()).await;
    let b = seed_account(&db, "bob", Currency::ron()).await;

    let transfer = Transfer::new(
        Counterparty::internal(&a, "alice"),
        Counterparty::internal(&b, "bob"),
        dec!(10),
        Currency::ron(),
        None,
        "lunch",
    );

    // Dropped transaction rolls back
    {
        let mut tx = db.pool().begin().await.unwrap();
        TransferRepo::insert(&mut tx, &transfer).await.unwrap();
    }
    let mut conn = db.pool().acquire().await.unwrap();
    assert_eq!(TransferRepo::count(&mut conn).await.unwrap(), 0);
    drop(conn);

    let mut tx = db.pool().begin().await.unwrap();
    TransferRepo::insert(&mut tx, &transfer).await.unwrap();
    tx.commit().await.unwrap();

    let mut conn = db.pool().acquire().await.unwrap();
    let for_b = TransferRepo::get_by_account(&mut conn, &b.id).await.unwrap();
    assert_eq!(for_b, vec![transfer.clone()]);
    let loaded = TransferRepo::get_by_id(&mut conn, &transfer.id).await.unwrap();
    assert_eq!(loaded.note, "lunch");
}

#[tokio::test]
async fn test_request_resolve_only_once() {
    let db = Database::in_memory().await.unwrap();
    seed_user(&db, "alice").await;
    seed_user(&db, "bob").await;
    let a = seed_account(&db, "alice", Currency::ron()).await;

    let mut request = TransferRequest::new(
        "alice",
        &a.id,
        "bob",
        RequestKind::Request,
        dec!(12),
        Currency::ron(),
        "cinema",
        None,
    )
    .unwrap();

    let mut conn = db.pool().acquire().await.unwrap();
    RequestRepo::insert(&mut conn, &request).await.unwrap();

    let pending = RequestRepo::get_pending_for_user(&mut conn, "bob").await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, RequestKind::Request);

    let stale = request.clone();
    request.resolve(RequestStatus::Declined).unwrap();
    RequestRepo::resolve(&mut conn, &request).await.unwrap();

    let mut racing = stale;
    racing.resolve(RequestStatus::Accepted).unwrap();
    let err = RequestRepo::resolve(&mut conn, &racing).await.unwrap_err();
    assert!(err.is_conflict());

    let loaded = RequestRepo::get_by_id(&mut conn, &request.id).await.unwrap();
    assert_eq!(loaded.status, RequestStatus::Declined);
    assert!(loaded.resolved_at.is_some());
    assert!(RequestRepo::get_pending_for_user(&mut conn, "alice")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_party_completion_is_monotonic() {
    let db = Database::in_memory().await.unwrap();
    seed_user(&db, "host").await;
    seed_user(&db, "ann").await;
    let host_account = seed_account(&db, "host", Currency::ron()).await;

    let shares = vec![PartyShare::new("ann", dec!(10))];
    let party = Party::new("host", &host_account.id, "dinner", &shares).unwrap();
    let member = PartyMember::new(&party.id, &shares[0]);

    let mut conn = db.pool().acquire().await.unwrap();
    PartyRepo::insert(&mut conn, &party).await.unwrap();
    PartyMemberRepo::insert(&mut conn, &member).await.unwrap();

    PartyMemberRepo::update_status(&mut conn, &member.id, MemberStatus::Accepted)
        .await
        .unwrap();
    assert!(PartyRepo::mark_completed(&mut conn, &party.id).await.unwrap());
    assert!(!PartyRepo::mark_completed(&mut conn, &party.id).await.unwrap());

    let loaded = PartyRepo::get_by_id(&mut conn, &party.id).await.unwrap();
    assert!(loaded.completed);

    let for_ann = PartyRepo::get_for_user(&mut conn, "ann").await.unwrap();
    assert_eq!(for_ann.len(), 1);
    let for_host = PartyRepo::get_for_user(&mut conn, "host").await.unwrap();
    assert_eq!(for_host.len(), 1);

    let members = PartyMemberRepo::get_by_party(&mut conn, &party.id).await.unwrap();
    assert_eq!(members[0].status, MemberStatus::Accepted);
}

#[tokio::test]
async fn test_file_database_with_audit_log() {
    let dir = TempDir::new().unwrap();
    let db_url = format!("sqlite:{}", dir.path().join("paybank.db").display());
    let events = dir.path().join("events");

    {
        let db = Database::open(&db_url, Some(&events)).await.unwrap();
        seed_user(&db, "alice").await;
        assert!(db.events().is_some());
        db.pool().close().await;
    }

    let db = Database::open(&db_url, None::<&std::path::Path>).await.unwrap();
    let mut conn = db.pool().acquire().await.unwrap();
    let users = UserRepo::get_all(&mut conn).await.unwrap();
    assert_eq!(users.len(), 1);
    assert!(events.exists());
}
