//! The membership ledger: the authoritative (user, group) -> role
//! mapping, plus moderation status.
//!
//! Sanctions never delete the row. A kicked or banned member keeps
//! their ledger entry (history, and the ban has to outlive the
//! membership) and the authorization layer filters them out instead.

use super::DbError;
use crate::groups::roles::Role;
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

/// A full membership row.
#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub role: Role,
    pub sanction: SanctionRow,
    pub joined_at: i64,
}

/// Sanction state stored on a membership row.
#[derive(Debug, Clone, Default)]
pub struct SanctionRow {
    pub is_kicked: bool,
    pub kicked_until: Option<i64>,
    pub is_banned: bool,
    pub modded_reason: Option<String>,
    pub modded_by: Option<Uuid>,
}

/// A member joined with their user profile, for listings.
#[derive(Debug, Clone)]
pub struct MemberProfile {
    pub user_id: Uuid,
    pub role: Role,
    pub username: String,
    pub email: String,
}

/// Repository for the membership ledger.
pub struct MemberRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MemberRepository<'a> {
    /// Create a new membership repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Enroll a user in a group with the given role.
    ///
    /// Idempotent: inserting an already-present (user, group) pair is a
    /// no-op. Two concurrent joins may both pass the "not a member"
    /// check; the conflict-tolerant insert resolves that race without
    /// erroring either caller.
    pub async fn add(&self, user_id: Uuid, group_id: Uuid, role: Role) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO group_members (user_id, group_id, role, joined_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id, group_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .bind(role.as_str())
        .bind(now)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Remove a membership row (explicit leave).
    pub async fn remove(&self, user_id: Uuid, group_id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM group_members WHERE user_id = ? AND group_id = ?")
            .bind(user_id)
            .bind(group_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetch a full membership row.
    pub async fn get(&self, user_id: Uuid, group_id: Uuid) -> Result<Option<MemberRecord>, DbError> {
        let row = sqlx::query_as::<
            _,
            (
                Uuid,
                Uuid,
                String,
                bool,
                Option<i64>,
                bool,
                Option<String>,
                Option<Uuid>,
                i64,
            ),
        >(
            r#"
            SELECT user_id, group_id, role, is_kicked, kicked_until, is_banned,
                   modded_reason, modded_by, joined_at
            FROM group_members
            WHERE user_id = ? AND group_id = ?
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(
            |(
                user_id,
                group_id,
                role,
                is_kicked,
                kicked_until,
                is_banned,
                modded_reason,
                modded_by,
                joined_at,
            )| {
                Ok(MemberRecord {
                    user_id,
                    group_id,
                    role: parse_role(&role)?,
                    sanction: SanctionRow {
                        is_kicked,
                        kicked_until,
                        is_banned,
                        modded_reason,
                        modded_by,
                    },
                    joined_at,
                })
            },
        )
        .transpose()
    }

    /// Role of a user in a group, if a membership row exists.
    pub async fn role_of(&self, user_id: Uuid, group_id: Uuid) -> Result<Option<Role>, DbError> {
        let role = sqlx::query_scalar::<_, String>(
            "SELECT role FROM group_members WHERE user_id = ? AND group_id = ?",
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_optional(self.pool)
        .await?;

        role.map(|r| parse_role(&r)).transpose()
    }

    /// All user IDs with a membership row in the group, sanctioned or not.
    pub async fn members_of(&self, group_id: Uuid) -> Result<Vec<Uuid>, DbError> {
        let rows =
            sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM group_members WHERE group_id = ?")
                .bind(group_id)
                .fetch_all(self.pool)
                .await?;

        Ok(rows)
    }

    /// Holders of any non-default role in the group.
    pub async fn special_role_holders(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<(Uuid, Role)>, DbError> {
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT user_id, role FROM group_members WHERE group_id = ? AND role != ?",
        )
        .bind(group_id)
        .bind(Role::Member.as_str())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(user_id, role)| Ok((user_id, parse_role(&role)?)))
            .collect()
    }

    /// Change the role on a membership row.
    pub async fn set_role(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        role: Role,
    ) -> Result<(), DbError> {
        sqlx::query("UPDATE group_members SET role = ? WHERE user_id = ? AND group_id = ?")
            .bind(role.as_str())
            .bind(user_id)
            .bind(group_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Sanction state of a membership row, if one exists.
    pub async fn sanction_of(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> Result<Option<SanctionRow>, DbError> {
        let row = sqlx::query_as::<_, (bool, Option<i64>, bool, Option<String>, Option<Uuid>)>(
            r#"
            SELECT is_kicked, kicked_until, is_banned, modded_reason, modded_by
            FROM group_members
            WHERE user_id = ? AND group_id = ?
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(
            |(is_kicked, kicked_until, is_banned, modded_reason, modded_by)| SanctionRow {
                is_kicked,
                kicked_until,
                is_banned,
                modded_reason,
                modded_by,
            },
        ))
    }

    /// Mark a member as kicked until the given timestamp.
    pub async fn set_kick(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        until: i64,
        reason: &str,
        by: Uuid,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE group_members
            SET is_kicked = 1, kicked_until = ?, modded_reason = ?, modded_by = ?
            WHERE user_id = ? AND group_id = ?
            "#,
        )
        .bind(until)
        .bind(reason)
        .bind(by)
        .bind(user_id)
        .bind(group_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Mark a member as permanently banned.
    pub async fn set_ban(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        reason: &str,
        by: Uuid,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE group_members
            SET is_banned = 1, modded_reason = ?, modded_by = ?
            WHERE user_id = ? AND group_id = ?
            "#,
        )
        .bind(reason)
        .bind(by)
        .bind(user_id)
        .bind(group_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Clear an expired kick (the reconcile half of observe-and-reconcile).
    ///
    /// Returns whether a row was actually reset, so callers and tests
    /// can observe the lazy reinstatement write.
    pub async fn clear_kick(&self, user_id: Uuid, group_id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE group_members
            SET is_kicked = 0, kicked_until = NULL, modded_reason = NULL, modded_by = NULL
            WHERE user_id = ? AND group_id = ? AND is_kicked = 1
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Members of a group joined with their profile, excluding anyone
    /// banned or inside an active kick window.
    ///
    /// An elapsed kick (or one recorded without an end) is shown even
    /// before the status check has reconciled the row, so listings
    /// match what the status check would report. This read does not
    /// reconcile anything itself.
    pub async fn active_members(&self, group_id: Uuid) -> Result<Vec<MemberProfile>, DbError> {
        let now = chrono::Utc::now().timestamp();
        let rows = sqlx::query_as::<_, (Uuid, String, String, String)>(
            r#"
            SELECT m.user_id, m.role, u.username, u.email
            FROM group_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.group_id = ? AND m.is_banned = 0
              AND (m.is_kicked = 0 OR m.kicked_until IS NULL OR m.kicked_until <= ?)
            ORDER BY m.joined_at ASC
            "#,
        )
        .bind(group_id)
        .bind(now)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(user_id, role, username, email)| {
                Ok(MemberProfile {
                    user_id,
                    role: parse_role(&role)?,
                    username,
                    email,
                })
            })
            .collect()
    }

    /// All group IDs a user has a membership row in.
    pub async fn groups_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, DbError> {
        let rows =
            sqlx::query_scalar::<_, Uuid>("SELECT group_id FROM group_members WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(self.pool)
                .await?;

        Ok(rows)
    }
}

fn parse_role(raw: &str) -> Result<Role, DbError> {
    Role::from_str(raw).map_err(|_| DbError::Internal(format!("unknown role in ledger: {raw}")))
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use crate::groups::roles::Role;
    use uuid::Uuid;

    async fn seed_user(db: &Database, name: &str) -> Uuid {
        db.users()
            .register(name, &format!("{name}@example.com"), "pw-test-123")
            .await
            .unwrap()
            .id
    }

    async fn seed_group(db: &Database, code: &str) -> Uuid {
        db.groups().create("g", None, None, code).await.unwrap().id
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let db = Database::new(":memory:").await.unwrap();
        let user = seed_user(&db, "alice").await;
        let group = seed_group(&db, "INVAAA111").await;

        db.members().add(user, group, Role::Admin).await.unwrap();
        // Second insert is swallowed and must not downgrade the role
        db.members().add(user, group, Role::Member).await.unwrap();

        assert_eq!(
            db.members().role_of(user, group).await.unwrap(),
            Some(Role::Admin)
        );
        assert_eq!(db.members().members_of(group).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_special_role_holders_excludes_members() {
        let db = Database::new(":memory:").await.unwrap();
        let admin = seed_user(&db, "admin").await;
        let member = seed_user(&db, "member").await;
        let group = seed_group(&db, "INVBBB222").await;

        db.members().add(admin, group, Role::Admin).await.unwrap();
        db.members().add(member, group, Role::Member).await.unwrap();

        let special = db.members().special_role_holders(group).await.unwrap();
        assert_eq!(special, vec![(admin, Role::Admin)]);
    }

    #[tokio::test]
    async fn test_sanction_row_survives_and_clears() {
        let db = Database::new(":memory:").await.unwrap();
        let admin = seed_user(&db, "admin").await;
        let target = seed_user(&db, "target").await;
        let group = seed_group(&db, "INVCCC333").await;
        db.members().add(admin, group, Role::Admin).await.unwrap();
        db.members().add(target, group, Role::Member).await.unwrap();

        let until = chrono::Utc::now().timestamp() + 600;
        db.members()
            .set_kick(target, group, until, "spam", admin)
            .await
            .unwrap();

        let sanction = db
            .members()
            .sanction_of(target, group)
            .await
            .unwrap()
            .unwrap();
        assert!(sanction.is_kicked);
        assert_eq!(sanction.kicked_until, Some(until));
        assert_eq!(sanction.modded_by, Some(admin));

        // The membership row is retained while kicked
        assert_eq!(db.members().members_of(group).await.unwrap().len(), 2);
        // but active listings filter it out while the window holds
        assert_eq!(db.members().active_members(group).await.unwrap().len(), 1);

        assert!(db.members().clear_kick(target, group).await.unwrap());
        assert!(!db.members().clear_kick(target, group).await.unwrap());
        let sanction = db
            .members()
            .sanction_of(target, group)
            .await
            .unwrap()
            .unwrap();
        assert!(!sanction.is_kicked);
        assert_eq!(sanction.kicked_until, None);
    }

    #[tokio::test]
    async fn test_active_members_shows_elapsed_kicks() {
        let db = Database::new(":memory:").await.unwrap();
        let admin = seed_user(&db, "admin").await;
        let target = seed_user(&db, "target").await;
        let group = seed_group(&db, "INVEEE555").await;
        db.members().add(admin, group, Role::Admin).await.unwrap();
        db.members().add(target, group, Role::Member).await.unwrap();

        // Elapsed window: visible again even before the status check
        // has reconciled the row.
        let past = chrono::Utc::now().timestamp() - 10;
        db.members()
            .set_kick(target, group, past, "spam", admin)
            .await
            .unwrap();
        assert_eq!(db.members().active_members(group).await.unwrap().len(), 2);

        // The listing is a read: the row itself is still unreconciled.
        let sanction = db
            .members()
            .sanction_of(target, group)
            .await
            .unwrap()
            .unwrap();
        assert!(sanction.is_kicked);

        // An open window still hides the member.
        let future = chrono::Utc::now().timestamp() + 600;
        db.members()
            .set_kick(target, group, future, "spam", admin)
            .await
            .unwrap();
        assert_eq!(db.members().active_members(group).await.unwrap().len(), 1);
    }
}
