//! The Authorization Gate (§4.7): every core operation in this workspace
//! accepts a [`CallerMember`] and reaches the Domain Store only after
//! passing through [`CallerMember::require_tenant`] or
//! [`CallerMember::require_admin`]. HTTP/JWT verification that produces a
//! `CallerMember` in the first place is out of scope (§1) — callers here
//! are assumed already authenticated.

use turna_common::{AccountId, MemberId, TenantId};
use turna_domain::{Member, MemberRole, MemberStatus};
use turna_errors::{TurnaError, TurnaResult};

/// The authenticated principal every core operation is invoked with:
/// `(account_id, tenant_id, role)` plus enough identity to audit and
/// check membership-scoped invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerMember {
    pub member_id: MemberId,
    pub account_id: AccountId,
    pub tenant_id: TenantId,
    pub role: MemberRole,
}

impl CallerMember {
    pub fn from_active_member(member: &Member) -> TurnaResult<Self> {
        if member.status != MemberStatus::Active {
            return Err(TurnaError::forbidden("InactiveMember", "caller's membership is not ACTIVE"));
        }
        let account_id = member.account_id.ok_or_else(|| {
            TurnaError::forbidden("UnboundMember", "caller's membership is not bound to an account")
        })?;
        Ok(Self { member_id: member.id, account_id, tenant_id: member.tenant_id, role: member.role })
    }

    pub fn is_admin(&self) -> bool {
        self.role == MemberRole::Admin
    }

    /// Every resource read/write must pass this check before touching the
    /// store (§4.7): the resource's `tenant_id` must equal the caller's.
    /// Returns `Forbidden` without distinguishing "wrong tenant" from
    /// "doesn't exist" — tenant leakage through error specificity is the
    /// thing this gate exists to prevent.
    pub fn require_tenant(&self, resource_tenant_id: TenantId) -> TurnaResult<()> {
        if self.tenant_id != resource_tenant_id {
            return Err(TurnaError::forbidden("TenantMismatch", "resource does not belong to the caller's tenant"));
        }
        Ok(())
    }

    /// Role-gated operations (tenant admin actions, requeue, cross-account
    /// Account mutations) demand `role = admin` (§4.7).
    pub fn require_admin(&self) -> TurnaResult<()> {
        if !self.is_admin() {
            return Err(TurnaError::forbidden("AdminRequired", "operation requires the admin role"));
        }
        Ok(())
    }

    /// Combines both checks for the common case of an admin-only,
    /// tenant-scoped mutation (e.g. `removeMember`, `requeueJob`).
    pub fn require_tenant_admin(&self, resource_tenant_id: TenantId) -> TurnaResult<()> {
        self.require_tenant(resource_tenant_id)?;
        self.require_admin()
    }
}
