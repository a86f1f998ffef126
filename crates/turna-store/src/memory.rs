use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use turna_common::{AccountId, DemandId, FileId, HospitalId, JobId, MemberId, TenantId};
use turna_domain::{Account, Demand, File, Hospital, Job, JobKind, Member, MemberStatus, Tenant};
use turna_errors::{TurnaError, TurnaResult};

use crate::store::DomainStore;

/// A single-process, lock-guarded reference implementation of
/// [`DomainStore`], used across this workspace's test suites and as the
/// default store for examples. Every entity lives in its own `HashMap`
/// behind one `Mutex`, matching the teacher's preference for explicit,
/// inspectable in-memory fixtures over a mocking framework wherever a
/// real collaborator implementation would be disproportionate.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    tenants: HashMap<TenantId, Tenant>,
    accounts: HashMap<AccountId, Account>,
    members: HashMap<MemberId, Member>,
    hospitals: HashMap<HospitalId, Hospital>,
    files: HashMap<FileId, File>,
    jobs: HashMap<JobId, Job>,
    demands: HashMap<DemandId, Demand>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_tenant(&self, tenant: Tenant) {
        self.inner.lock().tenants.insert(tenant.id, tenant);
    }

    pub fn seed_account(&self, account: Account) {
        self.inner.lock().accounts.insert(account.id, account);
    }

    pub fn seed_hospital(&self, hospital: Hospital) {
        self.inner.lock().hospitals.insert(hospital.id, hospital);
    }

    pub fn seed_member(&self, member: Member) {
        self.inner.lock().members.insert(member.id, member);
    }
}

fn not_found(kind: &str, id: impl std::fmt::Display) -> TurnaError {
    TurnaError::not_found(format!("{kind}NotFound"), format!("{kind} {id} not found"))
}

#[async_trait::async_trait]
impl DomainStore for InMemoryStore {
    async fn get_tenant(&self, id: TenantId) -> TurnaResult<Tenant> {
        self.inner.lock().tenants.get(&id).cloned().ok_or_else(|| not_found("tenant", id))
    }

    async fn list_tenants(&self) -> TurnaResult<Vec<Tenant>> {
        Ok(self.inner.lock().tenants.values().cloned().collect())
    }

    async fn get_account(&self, id: AccountId) -> TurnaResult<Account> {
        self.inner.lock().accounts.get(&id).cloned().ok_or_else(|| not_found("account", id))
    }

    async fn find_account_by_email(&self, email: &str) -> TurnaResult<Option<Account>> {
        let normalized = Account::normalize_email(email);
        Ok(self.inner.lock().accounts.values().find(|a| a.email == normalized).cloned())
    }

    async fn create_account(&self, account: Account) -> TurnaResult<Account> {
        let mut guard = self.inner.lock();
        let normalized = Account::normalize_email(&account.email);
        if guard.accounts.values().any(|a| a.email == normalized) {
            return Err(TurnaError::conflict("DuplicateEmail", "an account with this email already exists"));
        }
        guard.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_member(&self, id: MemberId) -> TurnaResult<Member> {
        self.inner.lock().members.get(&id).cloned().ok_or_else(|| not_found("member", id))
    }

    async fn find_member_by_account(&self, tenant_id: TenantId, account_id: AccountId) -> TurnaResult<Option<Member>> {
        Ok(self
            .inner
            .lock()
            .members
            .values()
            .find(|m| m.tenant_id == tenant_id && m.account_id == Some(account_id))
            .cloned())
    }

    async fn find_pending_member_by_email(&self, tenant_id: TenantId, email: &str) -> TurnaResult<Option<Member>> {
        let normalized = Account::normalize_email(email);
        Ok(self
            .inner
            .lock()
            .members
            .values()
            .find(|m| {
                m.tenant_id == tenant_id
                    && m.status == MemberStatus::Pending
                    && m.account_id.is_none()
                    && m.email.as_deref().map(Account::normalize_email).as_deref() == Some(normalized.as_str())
            })
            .cloned())
    }

    async fn list_members_by_tenant(&self, tenant_id: TenantId) -> TurnaResult<Vec<Member>> {
        Ok(self.inner.lock().members.values().filter(|m| m.tenant_id == tenant_id).cloned().collect())
    }

    async fn list_members_by_account(&self, account_id: AccountId) -> TurnaResult<Vec<Member>> {
        Ok(self.inner.lock().members.values().filter(|m| m.account_id == Some(account_id)).cloned().collect())
    }

    async fn count_active_memberships(&self, account_id: AccountId) -> TurnaResult<u32> {
        Ok(self
            .inner
            .lock()
            .members
            .values()
            .filter(|m| m.account_id == Some(account_id) && m.status == MemberStatus::Active)
            .count() as u32)
    }

    async fn create_member(&self, member: Member) -> TurnaResult<Member> {
        let mut guard = self.inner.lock();
        guard.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn save_member(&self, member: Member) -> TurnaResult<Member> {
        let mut guard = self.inner.lock();
        if !guard.members.contains_key(&member.id) {
            return Err(not_found("member", member.id));
        }
        guard.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn get_hospital(&self, id: HospitalId) -> TurnaResult<Hospital> {
        self.inner.lock().hospitals.get(&id).cloned().ok_or_else(|| not_found("hospital", id))
    }

    async fn list_hospitals_by_tenant(&self, tenant_id: TenantId) -> TurnaResult<Vec<Hospital>> {
        Ok(self.inner.lock().hospitals.values().filter(|h| h.tenant_id == tenant_id).cloned().collect())
    }

    async fn get_file(&self, id: FileId) -> TurnaResult<File> {
        self.inner.lock().files.get(&id).cloned().ok_or_else(|| not_found("file", id))
    }

    async fn create_file(&self, file: File) -> TurnaResult<File> {
        self.inner.lock().files.insert(file.id, file.clone());
        Ok(file)
    }

    async fn delete_file(&self, id: FileId) -> TurnaResult<()> {
        self.inner.lock().files.remove(&id);
        Ok(())
    }

    async fn get_job(&self, id: JobId) -> TurnaResult<Job> {
        self.inner.lock().jobs.get(&id).cloned().ok_or_else(|| not_found("job", id))
    }

    async fn create_job(&self, job: Job) -> TurnaResult<Job> {
        self.inner.lock().jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn save_job(&self, job: Job) -> TurnaResult<Job> {
        let mut guard = self.inner.lock();
        if !guard.jobs.contains_key(&job.id) {
            return Err(not_found("job", job.id));
        }
        guard.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn recent_completed_jobs(&self, tenant_id: TenantId, kind: JobKind, limit: u32) -> TurnaResult<Vec<Job>> {
        let guard = self.inner.lock();
        let mut jobs: Vec<Job> = guard
            .jobs
            .values()
            .filter(|j| {
                j.tenant_id == tenant_id
                    && j.kind == kind
                    && j.status == turna_domain::JobStatus::Completed
                    && j.started_at.is_some()
                    && j.completed_at.is_some()
            })
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        jobs.truncate(limit as usize);
        Ok(jobs)
    }

    async fn list_unstarted_pending_jobs(&self) -> TurnaResult<Vec<Job>> {
        Ok(self.inner.lock().jobs.values().filter(|j| j.is_unstarted_pending()).cloned().collect())
    }

    async fn get_demand(&self, id: DemandId) -> TurnaResult<Demand> {
        self.inner.lock().demands.get(&id).cloned().ok_or_else(|| not_found("demand", id))
    }

    async fn create_demand(&self, demand: Demand) -> TurnaResult<Demand> {
        self.inner.lock().demands.insert(demand.id, demand.clone());
        Ok(demand)
    }

    async fn list_demands_in_period(
        &self,
        tenant_id: TenantId,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        filter_hospital_id: Option<HospitalId>,
    ) -> TurnaResult<Vec<Demand>> {
        Ok(self
            .inner
            .lock()
            .demands
            .values()
            .filter(|d| {
                d.tenant_id == tenant_id
                    && d.start_time < period_end
                    && d.end_time > period_start
                    && filter_hospital_id.map(|h| d.hospital_id == Some(h)).unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn list_demands_by_job(&self, job_id: JobId) -> TurnaResult<Vec<Demand>> {
        Ok(self.inner.lock().demands.values().filter(|d| d.job_id == Some(job_id)).cloned().collect())
    }

    async fn save_demand(&self, demand: Demand) -> TurnaResult<Demand> {
        let mut guard = self.inner.lock();
        if !guard.demands.contains_key(&demand.id) {
            return Err(not_found("demand", demand.id));
        }
        guard.demands.insert(demand.id, demand.clone());
        Ok(demand)
    }

    async fn save_demands_batch(&self, demands: Vec<Demand>) -> TurnaResult<Vec<Demand>> {
        let mut guard = self.inner.lock();
        for d in &demands {
            if !guard.demands.contains_key(&d.id) {
                return Err(not_found("demand", d.id));
            }
        }
        for d in &demands {
            guard.demands.insert(d.id, d.clone());
        }
        Ok(demands)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use turna_domain::{AccountRole, MemberRole};
    use uuid::Uuid;

    use super::*;

    fn account(email: &str) -> Account {
        Account {
            id: AccountId::new(),
            email: Account::normalize_email(email),
            name: "Test".into(),
            auth_provider: "password".into(),
            role: AccountRole::Account,
        }
    }

    #[tokio::test]
    async fn create_account_rejects_duplicate_email() {
        let store = InMemoryStore::new();
        store.create_account(account("a@x.com")).await.unwrap();
        let err = store.create_account(account("A@X.com")).await.unwrap_err();
        assert_eq!(err.code, turna_errors::ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn save_job_requires_preexisting_row() {
        let store = InMemoryStore::new();
        let job = Job::new_pending(
            JobId::from_uuid(Uuid::nil()),
            TenantId::new(),
            JobKind::Ping,
            serde_json::json!({}),
            Utc::now(),
        );
        assert!(store.save_job(job).await.is_err());
    }

    #[tokio::test]
    async fn member_role_default_constructs() {
        let _ = MemberRole::Admin;
    }
}
