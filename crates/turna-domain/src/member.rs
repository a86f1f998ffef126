use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use strum::{Display, EnumString};
use turna_common::{AccountId, Instant, MemberId, TenantId};
use turna_errors::TurnaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MemberRole {
    Admin,
    Account,
}

/// ```text
///   PENDING ─accept→ ACTIVE ─remove→ REMOVED ─reinvite→ PENDING
///      └────reject→ REJECTED ──────reinvite→ PENDING
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    Pending,
    Active,
    Rejected,
    Removed,
}

/// A within-day or cross-day unavailability window. Within-day windows are
/// hour ranges against a specific `day`; the Allocation Solver treats a
/// vacation that spans multiple civil days as a day-index range instead
/// (see `turna-solver::Professional`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VacationRange {
    pub start: Instant,
    pub end: Instant,
}

/// The edge of `(Account, Tenant)`, carrying role, status, and the
/// scheduling-relevant attributes of a professional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub tenant_id: TenantId,
    pub account_id: Option<AccountId>,
    pub email: Option<String>,
    pub role: MemberRole,
    pub status: MemberStatus,
    pub name: Option<String>,
    pub can_peds: bool,
    /// Rotation key for the greedy solver's per-day fairness shift.
    /// `0` means "not a schedulable professional" (e.g. an admin-only
    /// account); only `sequence > 0` members are loaded for scheduling.
    pub sequence: u32,
    pub vacation: Vec<VacationRange>,
    pub attribute: JsonValue,
}

impl Member {
    /// `true` once this row no longer represents a live grant of access to
    /// its tenant; invite reactivation flows transition these rows back to
    /// `PENDING` rather than creating new ones.
    pub fn is_inactive(&self) -> bool {
        matches!(self.status, MemberStatus::Rejected | MemberStatus::Removed)
    }

    pub fn accept(&mut self) -> Result<(), TurnaError> {
        match self.status {
            MemberStatus::Pending => {
                self.status = MemberStatus::Active;
                Ok(())
            }
            other => Err(TurnaError::bad_request(
                "InvalidMemberTransition",
                format!("cannot accept invite from status {other}"),
            )),
        }
    }

    pub fn reject(&mut self) -> Result<(), TurnaError> {
        match self.status {
            MemberStatus::Pending => {
                self.status = MemberStatus::Rejected;
                Ok(())
            }
            other => Err(TurnaError::bad_request(
                "InvalidMemberTransition",
                format!("cannot reject invite from status {other}"),
            )),
        }
    }

    /// Transitions `ACTIVE -> REMOVED`. The last-foothold invariant (§3) is
    /// a cross-tenant check and is enforced by the store, not here.
    pub fn remove(&mut self) -> Result<(), TurnaError> {
        match self.status {
            MemberStatus::Active => {
                self.status = MemberStatus::Removed;
                Ok(())
            }
            other => Err(TurnaError::bad_request(
                "InvalidMemberTransition",
                format!("cannot remove member from status {other}"),
            )),
        }
    }

    /// `REJECTED | REMOVED -> PENDING`, optionally updating role. `ACTIVE`
    /// invites are returned unchanged by the caller (idempotent invite),
    /// so this is only called for rows that need reactivating.
    pub fn reinvite(&mut self, role: MemberRole) -> Result<(), TurnaError> {
        match self.status {
            MemberStatus::Rejected | MemberStatus::Removed => {
                self.status = MemberStatus::Pending;
                self.role = role;
                Ok(())
            }
            other => Err(TurnaError::bad_request(
                "InvalidMemberTransition",
                format!("cannot reinvite member from status {other}"),
            )),
        }
    }

    /// Binds a pending, email-identified invite to a concrete account,
    /// e.g. on that email's first sign-in (§4.2, S6).
    pub fn bind_account(&mut self, account_id: AccountId) {
        self.account_id = Some(account_id);
    }
}
