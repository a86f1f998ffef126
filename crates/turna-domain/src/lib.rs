//! Persistent entity types and their in-process invariants: `Tenant`,
//! `Account`, `Member`, `Hospital`, `File`, `Job`, `Demand`, `AuditLog`.
//!
//! These are plain structs with state-machine methods; the sole mutator
//! of their persisted form is `turna-store`'s `DomainStore`. Dynamic
//! dict-shaped payloads from the source (`result_data`, `schedule_result_data`)
//! are modeled here as typed records and persisted as opaque JSON only at
//! the storage boundary (§9).

pub mod account;
pub mod audit_log;
pub mod demand;
pub mod file;
pub mod hospital;
pub mod job;
pub mod member;
pub mod tenant;

pub use account::{Account, AccountRole};
pub use audit_log::{AuditEvent, AuditLog, AuditSink, NullAuditSink};
pub use demand::{Demand, ScheduleAllocation, ScheduleAllocationMetadata, ScheduleStatus};
pub use file::File;
pub use hospital::Hospital;
pub use job::{sanitize_error_message, Job, JobKind, JobStatus, ERROR_MESSAGE_MAX_LEN};
pub use member::{Member, MemberRole, MemberStatus, VacationRange};
pub use tenant::Tenant;
