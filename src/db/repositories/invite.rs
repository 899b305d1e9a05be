use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};
use tokio::task;

use super::user::hash_password;
use crate::entities::{invites, users};
use crate::error::{Error, Result};

pub struct InviteRepository {
    conn: DatabaseConnection,
}

impl InviteRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Record a freshly issued invite. The token is produced by the caller
    /// (a signed claim set naming the creator); admin-ness of `creator` is
    /// the caller's responsibility.
    pub async fn create(&self, creator: &users::Model, token: String) -> Result<invites::Model> {
        let invite = invites::ActiveModel {
            token: Set(token),
            created_by: Set(creator.id),
            created_at: Set(Utc::now()),
            claimed_by: Set(None),
            claimed_at: Set(None),
            ..Default::default()
        };

        Ok(invite.insert(&self.conn).await?)
    }

    pub async fn by_token(&self, token: &str) -> Result<invites::Model> {
        invites::Entity::find()
            .filter(invites::Column::Token.eq(token))
            .one(&self.conn)
            .await?
            .ok_or_else(|| Error::NoSuchInvite(token.to_string()))
    }

    /// Redeem an invite: create the new user and mark the invite claimed in
    /// the same transaction, so a failure on either side leaves neither a
    /// burned invite nor an orphaned account.
    pub async fn claim(&self, token: &str, name: &str, password: &str) -> Result<users::Model> {
        // Hash up front; argon2 is too slow to hold a transaction open for.
        let password = password.to_string();
        let passhash = task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| Error::Internal(format!("password hashing task panicked: {e}")))??;

        let txn = self.conn.begin().await?;

        let invite = invites::Entity::find()
            .filter(invites::Column::Token.eq(token))
            .one(&txn)
            .await?
            .ok_or_else(|| Error::NoSuchInvite(token.to_string()))?;

        if invite.claimed_by.is_some() || invite.claimed_at.is_some() {
            return Err(Error::AlreadyUsedInvite(token.to_string()));
        }

        let user = users::ActiveModel {
            name: Set(name.to_string()),
            passhash: Set(passhash),
            is_admin: Set(false),
            ..Default::default()
        };

        let user = match user.insert(&txn).await {
            Ok(model) => model,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(Error::UserExists(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut active: invites::ActiveModel = invite.into();
        active.claimed_by = Set(Some(user.id));
        active.claimed_at = Set(Some(Utc::now()));
        active.update(&txn).await?;

        txn.commit().await?;
        Ok(user)
    }

    /// Invites a user has issued, newest first, with claimant names resolved.
    pub async fn created_by(
        &self,
        user_id: i32,
    ) -> Result<Vec<(invites::Model, Option<String>)>> {
        let invites = invites::Entity::find()
            .filter(invites::Column::CreatedBy.eq(user_id))
            .order_by_desc(invites::Column::CreatedAt)
            .all(&self.conn)
            .await?;

        let claimant_ids: Vec<i32> = invites.iter().filter_map(|i| i.claimed_by).collect();
        let names: HashMap<i32, String> = if claimant_ids.is_empty() {
            HashMap::new()
        } else {
            users::Entity::find()
                .filter(users::Column::Id.is_in(claimant_ids))
                .all(&self.conn)
                .await?
                .into_iter()
                .map(|u| (u.id, u.name))
                .collect()
        };

        Ok(invites
            .into_iter()
            .map(|invite| {
                let claimant = invite.claimed_by.and_then(|id| names.get(&id).cloned());
                (invite, claimant)
            })
            .collect())
    }
}
