use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use strum::{Display, EnumString};
use turna_common::{AccountId, AuditLogId, Instant, MemberId, TenantId};

/// A closed catalogue of audit-worthy events (§9: promote the source's
/// stringly-typed `event_type` to a first-class sum type, keeping a
/// string codec only at the persistence boundary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditEvent {
    MemberInvited,
    MemberReinvited,
    InviteAccepted,
    InviteRejected,
    MemberRemoved,
    JobEnqueued,
    JobCancelled,
    JobRequeued,
    ScheduleGenerated,
    SchedulePublished,
    ScheduleDeleted,
}

/// Append-only, best-effort. A failed audit write never aborts the
/// business transaction it describes (§3, §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: AuditLogId,
    pub tenant_id: Option<TenantId>,
    pub account_id: AccountId,
    pub member_id: Option<MemberId>,
    pub event_type: AuditEvent,
    pub data: JsonValue,
    pub created_at: Instant,
}

impl AuditLog {
    pub fn new(
        tenant_id: Option<TenantId>,
        account_id: AccountId,
        member_id: Option<MemberId>,
        event_type: AuditEvent,
        data: JsonValue,
        now: Instant,
    ) -> Self {
        Self { id: AuditLogId::new(), tenant_id, account_id, member_id, event_type, data, created_at: now }
    }
}

/// Fire-and-forget sink the business layer writes through. Modeled as
/// message passing rather than an in-transaction write (§9): a failing
/// sink implementation must swallow its own errors, never propagate them
/// back into the caller's transaction.
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditLog);
}

/// A sink that drops every entry; the default for tests and for any
/// caller with no audit destination configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

#[async_trait::async_trait]
impl AuditSink for NullAuditSink {
    async fn record(&self, _entry: AuditLog) {}
}
