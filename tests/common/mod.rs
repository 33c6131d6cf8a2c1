//! Shared helpers for integration tests.

use circled::db::Database;
use circled::groups;
use uuid::Uuid;

pub struct TestApp {
    pub db: Database,
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        Ok(Self {
            db: Database::new(":memory:").await?,
        })
    }

    pub async fn user(&self, name: &str) -> anyhow::Result<Uuid> {
        let user = self
            .db
            .users()
            .register(name, &format!("{name}@example.com"), "pw-test-123")
            .await?;
        Ok(user.id)
    }

    /// Create a group through the real creation path; the owner becomes
    /// its sole admin. Returns the group ID and its invite code.
    pub async fn group(&self, owner: Uuid, name: &str) -> anyhow::Result<(Uuid, String)> {
        let group = groups::create_group(&self.db, owner, name, None).await?;
        Ok((group.id, group.invite_code))
    }
}
