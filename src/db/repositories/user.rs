use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use tokio::task;

use crate::entities::users;
use crate::error::{Error, Result};

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create a user with a freshly hashed password. The unique index on
    /// `name` is the only signup collision check.
    pub async fn create(&self, name: &str, password: &str) -> Result<users::Model> {
        let passhash = hash_password_blocking(password).await?;

        let user = users::ActiveModel {
            name: Set(name.to_string()),
            passhash: Set(passhash),
            is_admin: Set(false),
            ..Default::default()
        };

        match user.insert(&self.conn).await {
            Ok(model) => Ok(model),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(Error::UserExists(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn by_name(&self, name: &str) -> Result<users::Model> {
        users::Entity::find()
            .filter(users::Column::Name.eq(name))
            .one(&self.conn)
            .await?
            .ok_or_else(|| Error::NoSuchUser(name.to_string()))
    }

    pub async fn by_id(&self, id: i32) -> Result<Option<users::Model>> {
        Ok(users::Entity::find_by_id(id).one(&self.conn).await?)
    }

    /// Verify credentials and return the user. Argon2 verification runs in
    /// `spawn_blocking`; it is CPU-bound and would stall the runtime.
    pub async fn authenticate(&self, name: &str, password: &str) -> Result<users::Model> {
        let user = self.by_name(name).await?;

        let passhash = user.passhash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || verify_password(&password, &passhash))
            .await
            .map_err(|e| Error::Internal(format!("password verification task panicked: {e}")))??;

        if is_valid {
            Ok(user)
        } else {
            Err(Error::BadPassword(name.to_string()))
        }
    }

    /// Change a user's password after verifying the old one.
    pub async fn change_password(&self, user: &users::Model, old: &str, new: &str) -> Result<()> {
        let passhash = user.passhash.clone();
        let old = old.to_string();

        let old_valid = task::spawn_blocking(move || verify_password(&old, &passhash))
            .await
            .map_err(|e| Error::Internal(format!("password verification task panicked: {e}")))??;

        if !old_valid {
            return Err(Error::BadPassword(user.name.clone()));
        }

        let new_hash = hash_password_blocking(new).await?;

        let mut active: users::ActiveModel = user.clone().into();
        active.passhash = Set(new_hash);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Explicit admin promotion; the only mutation `is_admin` ever sees.
    pub async fn set_admin(&self, name: &str) -> Result<users::Model> {
        let user = self.by_name(name).await?;

        let mut active: users::ActiveModel = user.into();
        active.is_admin = Set(true);
        Ok(active.update(&self.conn).await?)
    }
}

async fn hash_password_blocking(password: &str) -> Result<String> {
    let password = password.to_string();
    task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| Error::Internal(format!("password hashing task panicked: {e}")))?
}

/// Hash a password using Argon2id with the crate's default params.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Internal(format!("failed to hash password: {e}")))?;

    Ok(hash.to_string())
}

fn verify_password(password: &str, passhash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(passhash)
        .map_err(|e| Error::Internal(format!("invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
