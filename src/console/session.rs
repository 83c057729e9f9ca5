//! Per-operator console state and the registry that owns it.

use log::{debug, info};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

use super::confirm::StatusToggle;
use super::list::ListPage;
use super::notify::Notifier;
use super::wizard::VerificationWizard;
use crate::client::{ApiClient, ClientError, Transport};
use crate::config::ConsoleSettings;
use crate::guards::Operator;
use crate::models::{
    ChartPeriod, DashboardCharts, Membership, MembershipStatus, PlanStatus, SessionStatus, Slot,
    SlotStatus, SubscriptionPlan, TrainerProfile, TrainerVerification, TrainingSession, User,
    UserStatus, VerificationStatus,
};
use crate::query::{Mutation, Query, QueryClient, QueryOptions};
use crate::resources::{
    dashboard, memberships, sessions, slots, subscriptions, trainer, users, verifications,
};

/// Builds the transport for an operator's bearer token.
pub type TransportFactory =
    Arc<dyn Fn(&ConsoleSettings, &str) -> Result<Arc<dyn Transport>, ClientError> + Send + Sync>;

fn http_transport(settings: &ConsoleSettings, token: &str) -> Result<Arc<dyn Transport>, ClientError> {
    let client = ApiClient::new(
        &settings.api_base_url,
        Some(token.to_string()),
        settings.request_timeout,
    )?;
    Ok(Arc::new(client))
}

pub struct AdminPages {
    pub users: ListPage<User, UserStatus>,
    pub verifications: ListPage<TrainerVerification, VerificationStatus>,
    pub plans: ListPage<SubscriptionPlan, PlanStatus>,
    pub memberships: ListPage<Membership, MembershipStatus>,
    pub sessions: ListPage<TrainingSession, SessionStatus>,
    pub user_toggle: StatusToggle<UserStatus>,
    pub plan_toggle: StatusToggle<PlanStatus>,
    pub user_status: Mutation,
    pub plan_writes: Mutation,
    pub reviews: Mutation,
    /// Verification being reviewed; polled while open.
    pub open_verification: Option<Query<TrainerVerification>>,
    pub charts: Option<Query<DashboardCharts>>,
}

impl AdminPages {
    fn new(client: &QueryClient, settings: &ConsoleSettings) -> Self {
        let limit = settings.page_limit;
        AdminPages {
            users: ListPage::new(users::LIST, limit, QueryOptions::paginated()),
            verifications: ListPage::new(
                verifications::LIST,
                limit,
                QueryOptions::paginated().with_polling(settings.verification_poll),
            ),
            plans: ListPage::new(subscriptions::LIST, limit, QueryOptions::paginated()),
            memberships: ListPage::new(memberships::LIST, limit, QueryOptions::paginated()),
            sessions: ListPage::new(sessions::ADMIN_LIST, limit, QueryOptions::paginated()),
            user_toggle: StatusToggle::new(),
            plan_toggle: StatusToggle::new(),
            user_status: users::status_mutation(client),
            plan_writes: subscriptions::plan_mutation(client),
            reviews: verifications::review_mutation(client),
            open_verification: None,
            charts: None,
        }
    }
}

pub struct TrainerPages {
    pub slots: ListPage<Slot, SlotStatus>,
    pub sessions: ListPage<TrainingSession, SessionStatus>,
    pub wizard: VerificationWizard,
    pub slot_writes: Mutation,
    pub profile_writes: Mutation,
    pub verification_writes: Mutation,
    pub profile: Option<Query<TrainerProfile>>,
    pub verification: Option<Query<Option<TrainerVerification>>>,
}

impl TrainerPages {
    fn new(client: &QueryClient, settings: &ConsoleSettings) -> Self {
        let limit = settings.page_limit;
        TrainerPages {
            slots: ListPage::new(slots::LIST, limit, QueryOptions::paginated()),
            sessions: ListPage::new(sessions::TRAINER_LIST, limit, QueryOptions::paginated()),
            wizard: VerificationWizard::new(),
            slot_writes: slots::slot_mutation(client),
            profile_writes: trainer::profile_mutation(client),
            verification_writes: trainer::verification_mutation(client),
            profile: None,
            verification: None,
        }
    }
}

/// Console page an operator is looking at. Queries that poll belong to one
/// page and are unmounted when the operator moves to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Users,
    Verifications,
    Plans,
    Memberships,
    Sessions,
    Dashboard,
    Slots,
    TrainerSessions,
    Profile,
    Wallet,
    TrainerDashboard,
    Verification,
}

/// Everything the console remembers for one operator.
pub struct ConsoleSession {
    pub client: QueryClient,
    pub settings: ConsoleSettings,
    pub notifier: Notifier,
    pub admin: AdminPages,
    pub trainer: TrainerPages,
    page: Option<Page>,
}

impl ConsoleSession {
    pub fn new(transport: Arc<dyn Transport>, settings: &ConsoleSettings) -> Self {
        let client = QueryClient::new(transport);
        ConsoleSession {
            notifier: Notifier::new(settings.max_notifications),
            admin: AdminPages::new(&client, settings),
            trainer: TrainerPages::new(&client, settings),
            settings: settings.clone(),
            client,
            page: None,
        }
    }

    pub fn page(&self) -> Option<Page> {
        self.page
    }

    /// Moves to `page`, unmounting the queries owned by any other page.
    /// Dialog, wizard and list-control state survive the move.
    pub fn enter(&mut self, page: Page) {
        if self.page != Some(page) {
            debug!("console page {:?} -> {:?}", self.page, page);
        }
        self.page = Some(page);
        self.unmount_except(Some(page));
    }

    /// Unmounts every page's queries, e.g. when the console is closed.
    pub fn leave(&mut self) {
        self.page = None;
        self.unmount_except(None);
    }

    fn unmount_except(&mut self, page: Option<Page>) {
        if page != Some(Page::Verifications) {
            self.admin.verifications.unmount();
            self.admin.open_verification = None;
        }
        if page != Some(Page::Dashboard) {
            self.admin.charts = None;
        }
        if page != Some(Page::Profile) {
            self.trainer.profile = None;
        }
        if page != Some(Page::Verification) {
            self.trainer.verification = None;
        }
    }

    /// Mounts the review query for `id`, replacing any other open one.
    pub fn open_verification(&mut self, id: &str) -> &Query<TrainerVerification> {
        let key = verifications::detail_key(id);
        let client = &self.client;
        let options = QueryOptions::polling(self.settings.verification_poll);
        let slot = &mut self.admin.open_verification;
        if slot.as_ref().is_some_and(|q| q.key() != &key) {
            *slot = None;
        }
        slot.get_or_insert_with(|| verifications::mount_detail(client, id, &options))
    }

    /// Switching the period keeps the previous series on screen until the
    /// new one arrives.
    pub fn charts(&mut self, period: ChartPeriod) -> &Query<DashboardCharts> {
        let key = dashboard::charts_key(period);
        let client = &self.client;
        let slot = &mut self.admin.charts;
        if slot.as_ref().is_some_and(|q| q.key() != &key) {
            let next = dashboard::mount_charts(client, period, slot.as_ref());
            *slot = Some(next);
        }
        slot.get_or_insert_with(|| dashboard::mount_charts(client, period, None))
    }

    pub fn profile(&mut self) -> &Query<TrainerProfile> {
        let client = &self.client;
        let poll = self.settings.profile_poll;
        self.trainer
            .profile
            .get_or_insert_with(|| trainer::mount_profile(client, poll))
    }

    pub fn verification_status(&mut self) -> &Query<Option<TrainerVerification>> {
        let client = &self.client;
        let poll = self.settings.verification_poll;
        self.trainer
            .verification
            .get_or_insert_with(|| trainer::mount_verification(client, poll))
    }
}

struct Entry {
    last_seen: Instant,
    client: QueryClient,
    session: Arc<AsyncMutex<ConsoleSession>>,
}

struct RegistryInner {
    settings: ConsoleSettings,
    idle: Duration,
    factory: TransportFactory,
    sessions: Mutex<HashMap<String, Entry>>,
}

/// Console sessions keyed by bearer token. Cheap to clone.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    pub fn new(settings: ConsoleSettings, idle: Duration) -> Self {
        Self::with_transport(settings, idle, Arc::new(http_transport))
    }

    pub fn with_transport(settings: ConsoleSettings, idle: Duration, factory: TransportFactory) -> Self {
        SessionRegistry {
            inner: Arc::new(RegistryInner {
                settings,
                idle,
                factory,
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn settings(&self) -> &ConsoleSettings {
        &self.inner.settings
    }

    /// Returns the session bound to this exact token, starting one if
    /// needed. The subject claim is not verified here, so it never selects a
    /// session; a renewed token gets a fresh session and the old one idles out.
    pub fn open(&self, operator: &Operator) -> Result<Arc<AsyncMutex<ConsoleSession>>, ClientError> {
        let mut sessions = self.inner.sessions.lock();
        let now = Instant::now();

        if let Some(entry) = sessions.get_mut(&operator.token) {
            entry.last_seen = now;
            return Ok(entry.session.clone());
        }

        let transport = (self.inner.factory)(&self.inner.settings, &operator.token)?;
        let session = ConsoleSession::new(transport, &self.inner.settings);
        let client = session.client.clone();
        let session = Arc::new(AsyncMutex::new(session));
        sessions.insert(
            operator.token.clone(),
            Entry {
                last_seen: now,
                client,
                session: session.clone(),
            },
        );
        drop(sessions);

        debug!("opened console session for {}", operator.subject);
        Ok(session)
    }

    pub fn len(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.sessions.lock().is_empty()
    }

    /// Evicts idle sessions, which stops their polling, then collects
    /// unsubscribed cache entries of the rest. Returns `(evicted, collected)`.
    pub fn sweep(&self) -> (usize, usize) {
        let now = Instant::now();
        let (evicted, live): (Vec<Entry>, Vec<QueryClient>) = {
            let mut sessions = self.inner.sessions.lock();
            let idle: Vec<String> = sessions
                .iter()
                .filter(|(_, e)| now.duration_since(e.last_seen) >= self.inner.idle)
                .map(|(token, _)| token.clone())
                .collect();
            let evicted = idle
                .iter()
                .filter_map(|token| sessions.remove(token))
                .collect();
            let live = sessions.values().map(|e| e.client.clone()).collect();
            (evicted, live)
        };

        let collected = live.iter().map(|client| client.cache().gc()).sum();
        let count = evicted.len();
        drop(evicted);
        (count, collected)
    }
}

/// Background loop started at liftoff.
pub async fn run_sweeper(registry: SessionRegistry, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let (evicted, collected) = registry.sweep();
        if evicted > 0 || collected > 0 {
            info!(
                "console sweep: {} idle sessions closed, {} cache entries collected",
                evicted, collected
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::client::Method;
    use crate::guards::Role;
    use crate::query::testing::ScriptedTransport;
    use serde_json::json;

    fn operator(subject: &str, token: &str) -> Operator {
        Operator {
            subject: subject.to_string(),
            role: Role::Trainer,
            token: token.to_string(),
        }
    }

    fn admin(subject: &str, token: &str) -> Operator {
        Operator {
            role: Role::Admin,
            ..operator(subject, token)
        }
    }

    fn registry(transport: &ScriptedTransport) -> SessionRegistry {
        let transport = transport.clone();
        SessionRegistry::with_transport(
            ConsoleSettings::default(),
            Duration::from_secs(60),
            Arc::new(move |_: &ConsoleSettings, _: &str| Ok(Arc::new(transport.clone()) as Arc<dyn Transport>)),
        )
    }

    #[tokio::test]
    async fn same_token_reuses_the_session() {
        let registry = registry(&ScriptedTransport::new());
        let first = registry.open(&operator("t1", "tok-a")).unwrap();
        let again = registry.open(&operator("t1", "tok-a")).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        let renewed = registry.open(&operator("t1", "tok-b")).unwrap();
        assert!(!Arc::ptr_eq(&first, &renewed));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn a_token_claiming_the_same_subject_cannot_reach_the_session() {
        let registry = registry(&ScriptedTransport::new());
        let first = registry.open(&operator("t1", "tok-real")).unwrap();
        first.lock().await.notifier.info("Plan saved");

        let forged = registry.open(&operator("t1", "tok-forged")).unwrap();
        assert!(!Arc::ptr_eq(&first, &forged));
        assert!(forged.lock().await.notifier.drain().is_empty());

        let back = registry.open(&operator("t1", "tok-real")).unwrap();
        assert!(Arc::ptr_eq(&first, &back));
        assert_eq!(back.lock().await.notifier.drain().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_evicted_and_stop_polling() {
        let transport = ScriptedTransport::new();
        transport.on(Method::Get, "/trainer/profile", |_| Ok(json!({"id": "t1", "name": "Meera"})));
        let registry = registry(&transport);

        let session = registry.open(&operator("t1", "tok")).unwrap();
        session.lock().await.profile().ensure().await.unwrap();
        drop(session);

        tokio::time::sleep(Duration::from_secs(30)).await;
        let polled = transport.count(Method::Get, "/trainer/profile");
        assert!(polled >= 2);
        assert_eq!(registry.sweep().0, 0);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(registry.sweep().0, 1);
        assert!(registry.is_empty());

        let after_eviction = transport.count(Method::Get, "/trainer/profile");
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.count(Method::Get, "/trainer/profile"), after_eviction);
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_the_review_page_stops_its_polling() {
        let transport = ScriptedTransport::new();
        transport.on(Method::Get, "/admin/verification/v1", |_| {
            Ok(json!({"id": "v1", "trainerId": "t1", "status": "pending"}))
        });
        transport.on(Method::Get, "/admin/verification", |_| {
            Ok(json!({"verifications": [], "pagination": {"page": 1, "limit": 10, "total": 0, "totalPages": 0}}))
        });
        transport.on(Method::Get, "/admin/users", |_| {
            Ok(json!({"users": [], "pagination": {"page": 1, "limit": 10, "total": 0, "totalPages": 0}}))
        });
        let registry = registry(&transport);
        let session = registry.open(&admin("a1", "tok")).unwrap();

        {
            let mut locked = session.lock().await;
            let s = &mut *locked;
            s.enter(Page::Verifications);
            s.admin.verifications.load(&s.client).await;
            s.open_verification("v1").ensure().await.unwrap();
        }
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert!(transport.count(Method::Get, "/admin/verification/v1") >= 3);

        {
            let mut locked = session.lock().await;
            let s = &mut *locked;
            s.enter(Page::Users);
            s.admin.users.load(&s.client).await;
            assert!(s.admin.open_verification.is_none());
            assert!(!s.admin.verifications.is_mounted());
        }
        let detail = transport.count(Method::Get, "/admin/verification/v1");
        let listing = transport.count(Method::Get, "/admin/verification");

        for _ in 0..20 {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let mut locked = session.lock().await;
            let s = &mut *locked;
            s.enter(Page::Users);
            s.admin.users.load(&s.client).await;
        }
        assert_eq!(transport.count(Method::Get, "/admin/verification/v1"), detail);
        assert_eq!(transport.count(Method::Get, "/admin/verification"), listing);
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_the_console_stops_profile_polling() {
        let transport = ScriptedTransport::new();
        transport.on(Method::Get, "/trainer/profile", |_| Ok(json!({"id": "t1", "name": "Meera"})));
        let registry = registry(&transport);
        let session = registry.open(&operator("t1", "tok")).unwrap();

        let mut s = session.lock().await;
        s.enter(Page::Profile);
        s.profile().ensure().await.unwrap();
        s.leave();
        assert_eq!(s.page(), None);
        assert!(s.trainer.profile.is_none());
        drop(s);

        let polled = transport.count(Method::Get, "/trainer/profile");
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.count(Method::Get, "/trainer/profile"), polled);
    }

    #[tokio::test]
    async fn sweep_collects_unwatched_cache_entries() {
        let transport = ScriptedTransport::new();
        transport.on(Method::Get, "/admin/users", |_| Ok(json!({"users": []})));
        let registry = registry(&transport);
        let session = registry.open(&operator("a1", "tok")).unwrap();

        let client = session.lock().await.client.clone();
        client
            .fetch(&CacheKey::new("users"), crate::client::ApiRequest::get("/admin/users"))
            .await
            .unwrap();
        assert_eq!(client.cache().len(), 1);

        assert_eq!(registry.sweep(), (0, 1));
        assert!(client.cache().is_empty());
    }
}
