//! The moderation state machine.
//!
//! Per (user, group) the states are: clear -> kicked(until, reason, by)
//! -> clear again after expiry, or clear -> banned (terminal). Neither
//! sanction removes the membership row; the ledger keeps the history
//! and the authorization layer filters sanctioned members out.
//!
//! Expired kicks are reinstated lazily: [`check_status`] is an explicit
//! observe-and-reconcile operation that writes the reset back to the
//! ledger the first time it observes an elapsed kick. It is the only
//! place that write happens, so tests can assert on it.

use crate::db::Database;
use crate::error::{CoreError, Sanction};
use crate::groups::authz;
use tracing::info;
use uuid::Uuid;

/// Fixed kick duration.
pub const KICK_DURATION_DAYS: i64 = 7;

/// Moderation status of one membership, after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanctionStatus {
    /// Not sanctioned (includes "no membership row at all").
    Clear,
    /// Kicked, and the window has not elapsed yet.
    Kicked {
        until: i64,
        reason: Option<String>,
        by: Option<Uuid>,
    },
    /// Banned permanently.
    Banned {
        reason: Option<String>,
        by: Option<Uuid>,
    },
}

impl SanctionStatus {
    /// The sanction as seen by the sanctioned user, if any.
    pub fn active_sanction(&self) -> Option<Sanction> {
        match self {
            SanctionStatus::Clear => None,
            SanctionStatus::Kicked { until, .. } => Some(Sanction::Until(*until)),
            SanctionStatus::Banned { .. } => Some(Sanction::Permanent),
        }
    }
}

/// Kick a member for the fixed 7-day window.
///
/// Requires [`authz::can_moderate`]; records the reason and the acting
/// admin on the membership row without deleting it.
pub async fn kick(
    db: &Database,
    admin_id: Uuid,
    target_id: Uuid,
    group_id: Uuid,
    reason: &str,
) -> Result<i64, CoreError> {
    authz::can_moderate(db, admin_id, target_id, group_id).await?;

    let until = chrono::Utc::now().timestamp() + KICK_DURATION_DAYS * 86400;
    db.members()
        .set_kick(target_id, group_id, until, reason, admin_id)
        .await?;

    info!(
        user_id = %target_id,
        group_id = %group_id,
        by = %admin_id,
        until,
        "Member kicked"
    );
    Ok(until)
}

/// Ban a member permanently.
///
/// Requires [`authz::can_moderate`]; no status check ever lifts a ban.
pub async fn ban(
    db: &Database,
    admin_id: Uuid,
    target_id: Uuid,
    group_id: Uuid,
    reason: &str,
) -> Result<(), CoreError> {
    authz::can_moderate(db, admin_id, target_id, group_id).await?;

    db.members()
        .set_ban(target_id, group_id, reason, admin_id)
        .await?;

    info!(
        user_id = %target_id,
        group_id = %group_id,
        by = %admin_id,
        "Member banned"
    );
    Ok(())
}

/// Observe-and-reconcile a membership's moderation status.
///
/// Bans always win. An active kick is reported as-is; an elapsed kick
/// is reset to clear in the ledger as a side effect of this very check,
/// exactly once per expiry, and then reported as [`SanctionStatus::Clear`].
pub async fn check_status(
    db: &Database,
    user_id: Uuid,
    group_id: Uuid,
) -> Result<SanctionStatus, CoreError> {
    let Some(row) = db.members().sanction_of(user_id, group_id).await? else {
        return Ok(SanctionStatus::Clear);
    };

    if row.is_banned {
        return Ok(SanctionStatus::Banned {
            reason: row.modded_reason,
            by: row.modded_by,
        });
    }

    if row.is_kicked {
        let now = chrono::Utc::now().timestamp();
        match row.kicked_until {
            Some(until) if until > now => {
                return Ok(SanctionStatus::Kicked {
                    until,
                    reason: row.modded_reason,
                    by: row.modded_by,
                });
            }
            _ => {
                // Kick window elapsed (or was recorded without an end,
                // which we treat as expired): lazy reinstatement.
                if db.members().clear_kick(user_id, group_id).await? {
                    info!(
                        user_id = %user_id,
                        group_id = %group_id,
                        "Expired kick reset, member reinstated"
                    );
                }
            }
        }
    }

    Ok(SanctionStatus::Clear)
}
