use chrono::{DateTime, Utc};
use turna_common::{AccountId, DemandId, FileId, HospitalId, JobId, MemberId, TenantId};
use turna_domain::{Account, Demand, File, Hospital, Job, JobKind, Member, Tenant};
use turna_errors::TurnaResult;

/// The system's persistence boundary (§1: "Database schema evolution …
/// the system's persistence boundary; the spec names only logical
/// tables"). Every core operation reaches the database only through this
/// trait; its methods are shaped the way a `tokio-postgres`/
/// `deadpool-postgres` implementation would naturally expose them —
/// CAS-style updates, one-transaction batch writes — even though only an
/// in-memory implementation ships with this crate.
///
/// All reads/writes are implicitly tenant-scoped by the caller passing a
/// `TenantId`; the store itself does not re-derive authorization (that is
/// `turna-auth`'s job) but every method that takes a `TenantId` must never
/// return or mutate a row belonging to a different tenant.
#[async_trait::async_trait]
pub trait DomainStore: Send + Sync {
    // -- Tenant --------------------------------------------------------
    async fn get_tenant(&self, id: TenantId) -> TurnaResult<Tenant>;
    async fn list_tenants(&self) -> TurnaResult<Vec<Tenant>>;

    // -- Account ---------------------------------------------------------
    async fn get_account(&self, id: AccountId) -> TurnaResult<Account>;
    async fn find_account_by_email(&self, email: &str) -> TurnaResult<Option<Account>>;
    async fn create_account(&self, account: Account) -> TurnaResult<Account>;

    // -- Member ----------------------------------------------------------
    async fn get_member(&self, id: MemberId) -> TurnaResult<Member>;
    async fn find_member_by_account(&self, tenant_id: TenantId, account_id: AccountId) -> TurnaResult<Option<Member>>;
    async fn find_pending_member_by_email(&self, tenant_id: TenantId, email: &str) -> TurnaResult<Option<Member>>;
    async fn list_members_by_tenant(&self, tenant_id: TenantId) -> TurnaResult<Vec<Member>>;
    async fn list_members_by_account(&self, account_id: AccountId) -> TurnaResult<Vec<Member>>;
    /// Count of `ACTIVE` rows for this account across *every* tenant;
    /// backs the last-foothold rule (§3).
    async fn count_active_memberships(&self, account_id: AccountId) -> TurnaResult<u32>;
    async fn create_member(&self, member: Member) -> TurnaResult<Member>;
    /// Replaces the stored row. Implementations are expected to be a CAS
    /// on `status` in a real backend; the in-memory store here just
    /// overwrites under a single lock, which is an equivalent observable
    /// behavior for a single-process test double.
    async fn save_member(&self, member: Member) -> TurnaResult<Member>;

    // -- Hospital ----------------------------------------------------------
    async fn get_hospital(&self, id: HospitalId) -> TurnaResult<Hospital>;
    async fn list_hospitals_by_tenant(&self, tenant_id: TenantId) -> TurnaResult<Vec<Hospital>>;

    // -- File --------------------------------------------------------------
    async fn get_file(&self, id: FileId) -> TurnaResult<File>;
    async fn create_file(&self, file: File) -> TurnaResult<File>;
    async fn delete_file(&self, id: FileId) -> TurnaResult<()>;

    // -- Job ---------------------------------------------------------------
    async fn get_job(&self, id: JobId) -> TurnaResult<Job>;
    async fn create_job(&self, job: Job) -> TurnaResult<Job>;
    async fn save_job(&self, job: Job) -> TurnaResult<Job>;
    /// Up to the last 10 `COMPLETED` jobs for `(tenant_id, kind)`, most
    /// recent `completed_at` first — the stale-window sample set (§4.3).
    async fn recent_completed_jobs(&self, tenant_id: TenantId, kind: JobKind, limit: u32) -> TurnaResult<Vec<Job>>;
    /// Every `PENDING` job with `started_at IS NULL`, across all tenants —
    /// the reconciler's scan set (§4.3).
    async fn list_unstarted_pending_jobs(&self) -> TurnaResult<Vec<Job>>;

    // -- Demand --------------------------------------------------------------
    async fn get_demand(&self, id: DemandId) -> TurnaResult<Demand>;
    async fn create_demand(&self, demand: Demand) -> TurnaResult<Demand>;
    async fn list_demands_in_period(
        &self,
        tenant_id: TenantId,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        filter_hospital_id: Option<HospitalId>,
    ) -> TurnaResult<Vec<Demand>>;
    async fn list_demands_by_job(&self, job_id: JobId) -> TurnaResult<Vec<Demand>>;
    async fn save_demand(&self, demand: Demand) -> TurnaResult<Demand>;
    /// Writes every demand in one transaction: either all rows land or
    /// none do (§4.5, §5). Implementations must roll back entirely on any
    /// single failure.
    async fn save_demands_batch(&self, demands: Vec<Demand>) -> TurnaResult<Vec<Demand>>;
}
