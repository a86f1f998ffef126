//! Types shared across every crate in the scheduling core: typed ids, the
//! instant/interval time model, and the injectable [`time::Clock`].

pub mod ids;
pub mod time;

pub use ids::{AccountId, AuditLogId, DemandId, FileId, HospitalId, JobId, MemberId, TenantId};
pub use time::{Clock, FixedClock, Instant, Interval, SystemClock};
