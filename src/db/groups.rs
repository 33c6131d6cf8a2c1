//! Group repository: group records and invite-code persistence.

use super::DbError;
use sqlx::SqlitePool;
use uuid::Uuid;

/// A group row.
#[derive(Debug, Clone)]
pub struct GroupRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
    pub invite_code: String,
    pub rules_info: String,
    pub created_at: i64,
    pub updated_at: i64,
}

type GroupRow = (
    Uuid,
    String,
    Option<String>,
    Option<Uuid>,
    String,
    String,
    i64,
    i64,
);

fn record(row: GroupRow) -> GroupRecord {
    let (id, name, description, owner_id, invite_code, rules_info, created_at, updated_at) = row;
    GroupRecord {
        id,
        name,
        description,
        owner_id,
        invite_code,
        rules_info,
        created_at,
        updated_at,
    }
}

const GROUP_COLUMNS: &str =
    "id, name, description, owner_id, invite_code, rules_info, created_at, updated_at";

/// Repository for group operations.
pub struct GroupRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> GroupRepository<'a> {
    /// Create a new group repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new group.
    ///
    /// A UNIQUE violation on the invite code is reported as
    /// [`DbError::InviteCodeTaken`] so the caller can decide whether to
    /// regenerate; it is never swallowed.
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
        owner_id: Option<Uuid>,
        invite_code: &str,
    ) -> Result<GroupRecord, DbError> {
        let now = chrono::Utc::now().timestamp();
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO groups (id, name, description, owner_id, invite_code, rules_info, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, '', ?, ?)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(owner_id)
        .bind(invite_code)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DbError::InviteCodeTaken(invite_code.to_string());
            }
            DbError::from(e)
        })?;

        Ok(GroupRecord {
            id,
            name: name.to_string(),
            description: description.map(String::from),
            owner_id,
            invite_code: invite_code.to_string(),
            rules_info: String::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Find group by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<GroupRecord>, DbError> {
        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(record))
    }

    /// Find group by invite code.
    pub async fn find_by_invite_code(&self, code: &str) -> Result<Option<GroupRecord>, DbError> {
        let row = sqlx::query_as::<_, GroupRow>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE invite_code = ?"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(record))
    }

    /// Replace a group's invite code.
    pub async fn set_invite_code(&self, id: Uuid, code: &str) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE groups SET invite_code = ?, updated_at = ? WHERE id = ?")
            .bind(code)
            .bind(now)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return DbError::InviteCodeTaken(code.to_string());
                }
                DbError::from(e)
            })?;
        Ok(())
    }

    /// Replace a group's rules text.
    pub async fn set_rules(&self, id: Uuid, rules: &str) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE groups SET rules_info = ?, updated_at = ? WHERE id = ?")
            .bind(rules)
            .bind(now)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Delete a group. Membership rows and posts cascade.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, DbError};

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = Database::new(":memory:").await.unwrap();

        let group = db
            .groups()
            .create("Bible Study", Some("Tuesday evenings"), None, "INVABC123")
            .await
            .unwrap();

        let by_id = db.groups().find_by_id(group.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "Bible Study");

        let by_code = db
            .groups()
            .find_by_invite_code("INVABC123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_code.id, group.id);

        assert!(
            db.groups()
                .find_by_invite_code("INVZZZ999")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_invite_code_collision_is_reported() {
        let db = Database::new(":memory:").await.unwrap();

        db.groups()
            .create("First", None, None, "INVAAA111")
            .await
            .unwrap();
        let dup = db.groups().create("Second", None, None, "INVAAA111").await;
        assert!(matches!(dup, Err(DbError::InviteCodeTaken(_))));
    }
}
