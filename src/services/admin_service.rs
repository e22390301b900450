use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::timeout;

use super::audit::{AuditEvent, AuditSink, NoopAuditSink, TracingAuditSink};
use super::decision_cache::DecisionCache;
use crate::auth::Identity;
use crate::config::AppConfig;
use crate::database::models::{NewProfile, Profile, Role};
use crate::database::profiles::ProfileStore;
use crate::database::DatabaseError;

/// Which strategy produced an admin decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMethod {
    Email,
    Cache,
    Database,
    Fallback,
    Invalid,
}

impl VerifyMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyMethod::Email => "email",
            VerifyMethod::Cache => "cache",
            VerifyMethod::Database => "database",
            VerifyMethod::Fallback => "fallback",
            VerifyMethod::Invalid => "invalid",
        }
    }
}

/// Outcome of one admin verification. Always structured: failure modes are
/// carried in `error`, never raised to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct AdminDecision {
    pub is_admin: bool,
    pub method: VerifyMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdminDecision {
    fn granted(method: VerifyMethod) -> Self {
        Self {
            is_admin: true,
            method,
            error: None,
        }
    }

    fn denied(method: VerifyMethod, error: Option<String>) -> Self {
        Self {
            is_admin: false,
            method,
            error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileAction {
    Created,
    Upgraded,
    Unchanged,
}

impl ReconcileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileAction::Created => "created",
            ReconcileAction::Upgraded => "upgraded",
            ReconcileAction::Unchanged => "unchanged",
        }
    }
}

/// Result of reconciling an administrator's profile row.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub profile: Profile,
    pub action: ReconcileAction,
}

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Admin verification and profile reconciliation.
///
/// All collaborators are injected: the profile store and audit sink behind
/// trait objects, the cache as an owned value constructed by the caller.
pub struct AdminService {
    store: Arc<dyn ProfileStore>,
    audit: Arc<dyn AuditSink>,
    allowlist: Vec<String>,
    cache: DecisionCache,
    lookup_timeout: Duration,
}

impl AdminService {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        audit: Arc<dyn AuditSink>,
        allowlist: Vec<String>,
        cache: DecisionCache,
        lookup_timeout: Duration,
    ) -> Self {
        let allowlist = allowlist
            .into_iter()
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty())
            .collect();

        Self {
            store,
            audit,
            allowlist,
            cache,
            lookup_timeout,
        }
    }

    pub fn from_config(config: &AppConfig, store: Arc<dyn ProfileStore>) -> Self {
        let cache = DecisionCache::new(
            Duration::from_secs(config.admin.cache_ttl_secs),
            config.admin.cache_max_entries,
        );
        let audit: Arc<dyn AuditSink> = if config.security.enable_audit_logging {
            Arc::new(TracingAuditSink)
        } else {
            Arc::new(NoopAuditSink)
        };

        Self::new(
            store,
            audit,
            config.admin.allowlist_emails.clone(),
            cache,
            Duration::from_millis(config.database.lookup_timeout_ms),
        )
    }

    pub fn cache(&self) -> &DecisionCache {
        &self.cache
    }

    /// Decide whether `identity` is an administrator.
    ///
    /// Strategies run in order and short-circuit: allowlist email, cached
    /// decision, profile lookup. Infrastructure failures downgrade into the
    /// fallback path instead of propagating.
    pub async fn verify_admin_status(&self, identity: &Identity) -> AdminDecision {
        let decision = self.decide(identity).await;
        self.audit
            .record(AuditEvent::verification(identity, &decision))
            .await;
        decision
    }

    async fn decide(&self, identity: &Identity) -> AdminDecision {
        if identity.id.is_nil() {
            tracing::warn!("admin verification rejected: nil user id for '{}'", identity.email);
            return AdminDecision::denied(
                VerifyMethod::Invalid,
                Some("invalid identity: nil user id".to_string()),
            );
        }

        // Evaluated first so the privileged accounts stay reachable even
        // with the database down.
        if self.is_allowlisted(&identity.email) {
            tracing::debug!("admin verification for {}: allowlist email", identity.id);
            return AdminDecision::granted(VerifyMethod::Email);
        }

        if let Some(cached) = self.cache.get(identity.id).await {
            tracing::debug!("admin verification for {}: cached decision {}", identity.id, cached);
            return AdminDecision {
                is_admin: cached,
                method: VerifyMethod::Cache,
                error: None,
            };
        }

        self.lookup_with_fallback(identity).await
    }

    /// Database strategy plus the failure fallback.
    ///
    /// Cache writes happen only here: allowlist decisions are cheap to
    /// re-derive, and a cached failure-path grant would outlive the failure
    /// it was meant to bridge. "No profile yet" is a transient state and is
    /// also left uncached.
    async fn lookup_with_fallback(&self, identity: &Identity) -> AdminDecision {
        let lookup = timeout(self.lookup_timeout, self.store.find_by_id(identity.id)).await;
        let result = match lookup {
            Ok(inner) => inner,
            Err(_) => Err(DatabaseError::Timeout(self.lookup_timeout.as_millis() as u64)),
        };

        match result {
            Ok(Some(profile)) => {
                let is_admin = profile.role == Role::Admin;
                self.cache.set(identity.id, is_admin).await;
                AdminDecision {
                    is_admin,
                    method: VerifyMethod::Database,
                    error: None,
                }
            }
            Ok(None) => AdminDecision::denied(
                VerifyMethod::Database,
                Some(format!("not admin: no profile found for user {}", identity.id)),
            ),
            Err(err) => {
                tracing::error!("profile lookup failed for {}: {}", identity.id, err);
                if self.is_allowlisted(&identity.email) {
                    AdminDecision::granted(VerifyMethod::Fallback)
                } else {
                    AdminDecision::denied(VerifyMethod::Fallback, Some(err.to_string()))
                }
            }
        }
    }

    /// Repair drift between the identity provider and the `profiles` table
    /// for an administrator: create the missing row or upgrade a stale role.
    ///
    /// Idempotent; identities that are not administrators are left untouched
    /// and yield `None`.
    pub async fn ensure_admin_profile(
        &self,
        identity: &Identity,
    ) -> Result<Option<Reconciliation>, AdminError> {
        let decision = self.verify_admin_status(identity).await;
        if !decision.is_admin {
            return Ok(None);
        }

        let outcome = match self.store.find_by_id(identity.id).await? {
            None => {
                let profile = self
                    .store
                    .insert(NewProfile {
                        id: identity.id,
                        email: identity.email.clone(),
                        full_name: display_name_from_email(&identity.email),
                        role: Role::Admin,
                    })
                    .await?;
                tracing::info!("created admin profile for {}", identity.id);
                Reconciliation {
                    profile,
                    action: ReconcileAction::Created,
                }
            }
            Some(profile) if profile.role != Role::Admin => {
                let profile = self.store.update_role(identity.id, Role::Admin).await?;
                tracing::info!("upgraded profile role to admin for {}", identity.id);
                Reconciliation {
                    profile,
                    action: ReconcileAction::Upgraded,
                }
            }
            Some(profile) => Reconciliation {
                profile,
                action: ReconcileAction::Unchanged,
            },
        };

        self.audit
            .record(AuditEvent::reconciliation(identity, outcome.action))
            .await;
        Ok(Some(outcome))
    }

    fn is_allowlisted(&self, email: &str) -> bool {
        self.allowlist.iter().any(|entry| entry == email)
    }
}

fn display_name_from_email(email: &str) -> Option<String> {
    email
        .split('@')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    use async_trait::async_trait;

    const ALLOWLIST_EMAIL: &str = "armazemsaojoaquimoficial@gmail.com";

    struct MockProfileStore {
        profiles: Mutex<HashMap<Uuid, Profile>>,
        find_calls: AtomicUsize,
        insert_calls: AtomicUsize,
        update_calls: AtomicUsize,
        fail: AtomicBool,
        delay: Mutex<Option<Duration>>,
    }

    impl MockProfileStore {
        fn empty() -> Arc<Self> {
            Arc::new(Self {
                profiles: Mutex::new(HashMap::new()),
                find_calls: AtomicUsize::new(0),
                insert_calls: AtomicUsize::new(0),
                update_calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                delay: Mutex::new(None),
            })
        }

        fn with_profile(profile: Profile) -> Arc<Self> {
            let store = Self::empty();
            store.profiles.lock().unwrap().insert(profile.id, profile);
            store
        }

        fn profile(id: Uuid, email: &str, role: Role) -> Profile {
            Profile {
                id,
                email: email.to_string(),
                full_name: None,
                role,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }
        }

        fn find_calls(&self) -> usize {
            self.find_calls.load(Ordering::SeqCst)
        }

        fn write_calls(&self) -> usize {
            self.insert_calls.load(Ordering::SeqCst) + self.update_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProfileStore for MockProfileStore {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, DatabaseError> {
            self.find_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut));
            }
            Ok(self.profiles.lock().unwrap().get(&id).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, DatabaseError> {
            Ok(self
                .profiles
                .lock()
                .unwrap()
                .values()
                .find(|profile| profile.email == email)
                .cloned())
        }

        async fn insert(&self, profile: NewProfile) -> Result<Profile, DatabaseError> {
            self.insert_calls.fetch_add(1, Ordering::SeqCst);
            let row = Profile {
                id: profile.id,
                email: profile.email,
                full_name: profile.full_name,
                role: profile.role,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.profiles.lock().unwrap().insert(row.id, row.clone());
            Ok(row)
        }

        async fn update_role(&self, id: Uuid, role: Role) -> Result<Profile, DatabaseError> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            let mut profiles = self.profiles.lock().unwrap();
            let row = profiles
                .get_mut(&id)
                .ok_or(DatabaseError::Sqlx(sqlx::Error::RowNotFound))?;
            row.role = role;
            row.updated_at = Utc::now();
            Ok(row.clone())
        }
    }

    fn service(store: Arc<MockProfileStore>) -> AdminService {
        AdminService::new(
            store,
            Arc::new(NoopAuditSink),
            vec![ALLOWLIST_EMAIL.to_string()],
            DecisionCache::new(Duration::from_secs(60), 64),
            Duration::from_millis(100),
        )
    }

    fn identity(email: &str) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn allowlist_email_wins_regardless_of_database_state() {
        let store = MockProfileStore::empty();
        store.fail.store(true, Ordering::SeqCst);
        let service = service(store.clone());

        let decision = service.verify_admin_status(&identity(ALLOWLIST_EMAIL)).await;

        assert!(decision.is_admin);
        assert_eq!(decision.method, VerifyMethod::Email);
        assert_eq!(store.find_calls(), 0);
    }

    #[tokio::test]
    async fn database_grant_is_cached_for_the_next_call() {
        let caller = identity("chef@armazem.com.br");
        let store = MockProfileStore::with_profile(MockProfileStore::profile(
            caller.id,
            &caller.email,
            Role::Admin,
        ));
        let service = service(store.clone());

        let cold = service.verify_admin_status(&caller).await;
        assert!(cold.is_admin);
        assert_eq!(cold.method, VerifyMethod::Database);

        let warm = service.verify_admin_status(&caller).await;
        assert!(warm.is_admin);
        assert_eq!(warm.method, VerifyMethod::Cache);
        assert_eq!(store.find_calls(), 1);
    }

    #[tokio::test]
    async fn non_admin_role_is_denied_and_cached() {
        let caller = identity("test@example.com");
        let store = MockProfileStore::with_profile(MockProfileStore::profile(
            caller.id,
            &caller.email,
            Role::User,
        ));
        let service = service(store.clone());

        let cold = service.verify_admin_status(&caller).await;
        assert!(!cold.is_admin);
        assert_eq!(cold.method, VerifyMethod::Database);
        assert!(cold.error.is_none());

        let warm = service.verify_admin_status(&caller).await;
        assert!(!warm.is_admin);
        assert_eq!(warm.method, VerifyMethod::Cache);
        assert_eq!(store.find_calls(), 1);
    }

    #[tokio::test]
    async fn missing_profile_is_denied_but_never_cached() {
        let store = MockProfileStore::empty();
        let service = service(store.clone());
        let caller = identity("nobody@example.com");

        let first = service.verify_admin_status(&caller).await;
        assert!(!first.is_admin);
        assert_eq!(first.method, VerifyMethod::Database);
        assert!(first.error.as_deref().unwrap_or("").contains("no profile"));

        // transient state: the second call must hit the store again
        let second = service.verify_admin_status(&caller).await;
        assert_eq!(second.method, VerifyMethod::Database);
        assert_eq!(store.find_calls(), 2);
        assert_eq!(service.cache().len().await, 0);
    }

    #[tokio::test]
    async fn lookup_failure_falls_back_to_allowlist_grant() {
        let store = MockProfileStore::empty();
        store.fail.store(true, Ordering::SeqCst);
        let service = service(store);

        // reached directly: the public path short-circuits allowlist emails
        // before the lookup step
        let decision = service
            .lookup_with_fallback(&identity(ALLOWLIST_EMAIL))
            .await;

        assert!(decision.is_admin);
        assert_eq!(decision.method, VerifyMethod::Fallback);
    }

    #[tokio::test]
    async fn lookup_failure_surfaces_error_for_everyone_else() {
        let store = MockProfileStore::empty();
        store.fail.store(true, Ordering::SeqCst);
        let service = service(store);

        let decision = service.verify_admin_status(&identity("test@example.com")).await;

        assert!(!decision.is_admin);
        assert_eq!(decision.method, VerifyMethod::Fallback);
        assert!(decision.error.is_some());
    }

    #[tokio::test]
    async fn slow_lookup_times_out_into_the_fallback_path() {
        let store = MockProfileStore::empty();
        *store.delay.lock().unwrap() = Some(Duration::from_millis(400));
        let service = service(store);

        let decision = service.verify_admin_status(&identity("test@example.com")).await;

        assert!(!decision.is_admin);
        assert_eq!(decision.method, VerifyMethod::Fallback);
        assert!(decision.error.as_deref().unwrap_or("").contains("timed out"));
    }

    #[tokio::test]
    async fn nil_user_id_is_rejected_without_side_effects() {
        let store = MockProfileStore::empty();
        let service = service(store.clone());
        let caller = Identity {
            id: Uuid::nil(),
            email: "test@example.com".to_string(),
        };

        let decision = service.verify_admin_status(&caller).await;

        assert!(!decision.is_admin);
        assert_eq!(decision.method, VerifyMethod::Invalid);
        assert!(decision.error.is_some());
        assert_eq!(store.find_calls(), 0);
        assert_eq!(service.cache().len().await, 0);
    }

    #[tokio::test]
    async fn reconciliation_creates_a_profile_for_an_allowlist_admin() {
        let store = MockProfileStore::empty();
        let service = service(store.clone());
        let caller = identity(ALLOWLIST_EMAIL);

        let decision = service.verify_admin_status(&caller).await;
        assert!(decision.is_admin);
        assert_eq!(decision.method, VerifyMethod::Email);

        let outcome = service.ensure_admin_profile(&caller).await.unwrap().unwrap();
        assert_eq!(outcome.action, ReconcileAction::Created);
        assert_eq!(outcome.profile.role, Role::Admin);
        assert_eq!(outcome.profile.email, ALLOWLIST_EMAIL);
        assert_eq!(store.insert_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reconciliation_upgrades_a_stale_role() {
        let caller = identity(ALLOWLIST_EMAIL);
        let store = MockProfileStore::with_profile(MockProfileStore::profile(
            caller.id,
            &caller.email,
            Role::User,
        ));
        let service = service(store.clone());

        let outcome = service.ensure_admin_profile(&caller).await.unwrap().unwrap();

        assert_eq!(outcome.action, ReconcileAction::Upgraded);
        assert_eq!(outcome.profile.role, Role::Admin);
        assert_eq!(store.update_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.insert_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reconciliation_is_idempotent() {
        let caller = identity("chef@armazem.com.br");
        let store = MockProfileStore::with_profile(MockProfileStore::profile(
            caller.id,
            &caller.email,
            Role::Admin,
        ));
        let service = service(store.clone());

        let first = service.ensure_admin_profile(&caller).await.unwrap().unwrap();
        let second = service.ensure_admin_profile(&caller).await.unwrap().unwrap();

        assert_eq!(first.action, ReconcileAction::Unchanged);
        assert_eq!(second.action, ReconcileAction::Unchanged);
        assert_eq!(first.profile, second.profile);
        assert_eq!(store.write_calls(), 0);
    }

    #[tokio::test]
    async fn reconciliation_skips_non_admins_entirely() {
        let caller = identity("test@example.com");
        let store = MockProfileStore::with_profile(MockProfileStore::profile(
            caller.id,
            &caller.email,
            Role::User,
        ));
        let service = service(store.clone());

        let decision = service.verify_admin_status(&caller).await;
        assert!(!decision.is_admin);
        assert_eq!(decision.method, VerifyMethod::Database);

        let outcome = service.ensure_admin_profile(&caller).await.unwrap();
        assert!(outcome.is_none());
        assert_eq!(store.write_calls(), 0);
    }

    struct RecordingAuditSink {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditSink for RecordingAuditSink {
        async fn record(&self, event: AuditEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[tokio::test]
    async fn every_verification_emits_an_audit_event() {
        let sink = Arc::new(RecordingAuditSink {
            events: Mutex::new(Vec::new()),
        });
        let service = AdminService::new(
            MockProfileStore::empty(),
            sink.clone(),
            vec![ALLOWLIST_EMAIL.to_string()],
            DecisionCache::new(Duration::from_secs(60), 64),
            Duration::from_millis(100),
        );

        let caller = identity(ALLOWLIST_EMAIL);
        service.verify_admin_status(&caller).await;

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "admin_verify");
        assert_eq!(events[0].method, Some("email"));
        assert!(events[0].success);
        assert_eq!(events[0].user_id, caller.id);
    }
}
