//! Accounts and the user directory
//!
//! Users and friendships belong to the session subsystem; the services here
//! only seed them and pick a user's default account.

use crate::context::ServiceContext;
use crate::error::{or_missing, BusinessError, BusinessResult};
use crate::transfer::{ensure_owner, load_account};
use paybank_core::{Account, Currency, Event, EventKind, User};
use paybank_persistence::{AccountRepo, UserRepo};
use rust_decimal::Decimal;
use tracing::{debug, info};

/// Account Service - open / disable accounts, register users
pub struct AccountService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AccountService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn register_user(&self, user_id: &str, name: &str) -> BusinessResult<User> {
        let user = User::new(user_id, name);
        let mut conn = self.ctx.pool().acquire().await?;
        UserRepo::insert(&mut conn, &user).await?;
        info!(user_id, "User registered");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> BusinessResult<User> {
        let mut conn = self.ctx.pool().acquire().await?;
        UserRepo::get_by_id(&mut conn, user_id)
            .await
            .map_err(|e| or_missing(e, || BusinessError::UnknownUser(user_id.to_string())))
    }

    /// Record that `user_id` lists `friend_id` as a friend. Friendship is
    /// mutual once both directions exist.
    pub async fn add_friend(&self, user_id: &str, friend_id: &str) -> BusinessResult<()> {
        let mut tx = self.ctx.begin().await?;
        for id in [user_id, friend_id] {
            if UserRepo::find(&mut tx, id).await?.is_none() {
                return Err(BusinessError::UnknownUser(id.to_string()));
            }
        }
        UserRepo::add_friend(&mut tx, user_id, friend_id).await?;
        tx.commit().await?;
        debug!(user_id, friend_id, "Friend added");
        Ok(())
    }

    /// Open an account. The user's first account becomes their default.
    pub async fn open_account(
        &self,
        actor_id: &str,
        currency: Currency,
        credit_limit: Decimal,
    ) -> BusinessResult<Account> {
        let mut tx = self.ctx.begin().await?;

        let user = UserRepo::find(&mut tx, actor_id)
            .await?
            .ok_or_else(|| BusinessError::UnknownUser(actor_id.to_string()))?;

        let account = Account::open(actor_id, currency, credit_limit)?;
        AccountRepo::insert(&mut tx, &account).await?;
        if user.default_account_id.is_none() {
            UserRepo::set_default_account(&mut tx, actor_id, Some(&account.id)).await?;
        }

        tx.commit().await?;

        info!(
            account_id = %account.id,
            currency = %account.currency,
            credit_limit = %account.credit_limit,
            "Account opened"
        );
        self.ctx.record(|id| {
            Event::new(id, EventKind::AccountOpened, actor_id, &account.id)
                .with_description(&account.iban)
        });
        Ok(account)
    }

    /// Soft-disable an account. It can no longer send or receive.
    pub async fn disable_account(&self, actor_id: &str, account_id: &str) -> BusinessResult<()> {
        let mut tx = self.ctx.begin().await?;
        let account = load_account(&mut tx, account_id).await?;
        ensure_owner(actor_id, &account, "disable this account")?;
        AccountRepo::set_disabled(&mut tx, account_id, true).await?;
        tx.commit().await?;

        info!(account_id, "Account disabled");
        self.ctx
            .record(|id| Event::new(id, EventKind::AccountDisabled, actor_id, account_id));
        Ok(())
    }

    pub async fn set_default_account(
        &self,
        actor_id: &str,
        account_id: &str,
    ) -> BusinessResult<()> {
        let mut tx = self.ctx.begin().await?;
        let account = load_account(&mut tx, account_id).await?;
        ensure_owner(actor_id, &account, "use this account as default")?;
        UserRepo::set_default_account(&mut tx, actor_id, Some(account_id)).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_account(&self, account_id: &str) -> BusinessResult<Account> {
        let mut conn = self.ctx.pool().acquire().await?;
        load_account(&mut conn, account_id).await
    }

    pub async fn accounts_for_user(&self, user_id: &str) -> BusinessResult<Vec<Account>> {
        let mut conn = self.ctx.pool().acquire().await?;
        Ok(AccountRepo::get_by_owner(&mut conn, user_id).await?)
    }
}
