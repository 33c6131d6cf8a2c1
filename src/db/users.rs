//! User repository: identities, credentials, and refresh tokens.

use super::DbError;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::SqlitePool;
use uuid::Uuid;

/// A registered user.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Repository for user operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a new user. Emails are stored lowercased and must be unique.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, DbError> {
        let password_hash = hash_password(password)?;
        let now = chrono::Utc::now().timestamp();
        let id = Uuid::new_v4();
        let email = email.to_lowercase();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(&email)
        .bind(&password_hash)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DbError::EmailExists(email.clone());
            }
            DbError::from(e)
        })?;

        Ok(User {
            id,
            username: username.to_string(),
            email,
            created_at: now,
            updated_at: now,
        })
    }

    /// Verify a password and return the user if valid.
    ///
    /// When the email is unknown a dummy Argon2 verification runs anyway,
    /// keeping the response time indistinguishable from a wrong password
    /// and preventing a timing oracle on account existence.
    pub async fn identify(&self, email: &str, password: &str) -> Result<User, DbError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, String, i64, i64)>(
            r#"
            SELECT id, username, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email.to_lowercase())
        .fetch_optional(self.pool)
        .await?;

        let Some((id, username, email, password_hash, created_at, updated_at)) = row else {
            dummy_password_verify(password);
            return Err(DbError::InvalidPassword);
        };

        verify_password(password, &password_hash)?;

        Ok(User {
            id,
            username,
            email,
            created_at,
            updated_at,
        })
    }

    /// Find user by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, i64, i64)>(
            r#"
            SELECT id, username, email, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|(id, username, email, created_at, updated_at)| User {
            id,
            username,
            email,
            created_at,
            updated_at,
        }))
    }

    /// Update a user's username.
    pub async fn set_username(&self, id: Uuid, username: &str) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE users SET username = ?, updated_at = ? WHERE id = ?")
            .bind(username)
            .bind(now)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Update a user's password.
    pub async fn set_password(&self, id: Uuid, password: &str) -> Result<(), DbError> {
        let password_hash = hash_password(password)?;
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(now)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Store a refresh token with its expiry.
    pub async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        ttl_days: u32,
    ) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();
        let expires_at = now + i64::from(ttl_days) * 86400;

        sqlx::query(
            r#"
            INSERT INTO user_tokens (token, user_id, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(now)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Look up the user behind a refresh token, rejecting expired or
    /// revoked tokens.
    pub async fn user_for_refresh_token(&self, token: &str) -> Result<Option<Uuid>, DbError> {
        let now = chrono::Utc::now().timestamp();
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT user_id FROM user_tokens
            WHERE token = ? AND expires_at > ? AND revoked_at IS NULL
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(self.pool)
        .await?;

        Ok(user_id)
    }

    /// Revoke a refresh token (rotation or logout).
    pub async fn revoke_refresh_token(&self, token: &str) -> Result<bool, DbError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE user_tokens SET revoked_at = ? WHERE token = ? AND revoked_at IS NULL",
        )
        .bind(now)
        .bind(token)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> Result<String, DbError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| DbError::InvalidPassword)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<(), DbError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| DbError::InvalidPassword)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| DbError::InvalidPassword)
}

/// Dummy password verification for constant-time account lookup.
///
/// Burns CPU time equivalent to a real Argon2 verification so that a
/// missing account is indistinguishable from a wrong password.
fn dummy_password_verify(password: &str) {
    const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$dGltaW5nLW9yYWNsZS1kdW1teQ$K4VZh8k8YL3E8H7E8H7E8H7E8H7E8H7E8H7E8H7E8Hs";

    if let Ok(parsed) = PasswordHash::new(DUMMY_HASH) {
        let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
    }
}
