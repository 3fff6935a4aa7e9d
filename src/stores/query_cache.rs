use crate::core::error::GatewayError;
use crate::models::attendance::AttendanceRecord;
use crate::models::session::{Session, SessionId};
use crate::models::user::{Principal, UserProfile, UserRole};
use crate::stores::invalidation::{Mutation, QueryFamily};
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Identity of a cached read
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum QueryKey {
    AllSessions,
    CallerAttendance,
    SessionAttendance(SessionId),
    CallerProfile,
    CallerRole,
    IsCallerAdmin,
    UserAttendance(Principal),
    UserProfile(Principal),
}

impl QueryKey {
    pub fn family(&self) -> QueryFamily {
        match self {
            QueryKey::AllSessions => QueryFamily::AllSessions,
            QueryKey::CallerAttendance => QueryFamily::CallerAttendance,
            QueryKey::SessionAttendance(_) => QueryFamily::SessionAttendance,
            QueryKey::CallerProfile => QueryFamily::CallerProfile,
            QueryKey::CallerRole => QueryFamily::CallerRole,
            QueryKey::IsCallerAdmin => QueryFamily::IsCallerAdmin,
            QueryKey::UserAttendance(_) => QueryFamily::UserAttendance,
            QueryKey::UserProfile(_) => QueryFamily::UserProfile,
        }
    }
}

/// Cached value of a read
#[derive(Clone, Debug, PartialEq)]
pub enum QueryData {
    Sessions(Vec<Session>),
    Attendance(Vec<AttendanceRecord>),
    Profile(Option<UserProfile>),
    Role(UserRole),
    Flag(bool),
}

type Slot = Arc<OnceCell<QueryData>>;

/// Read-through cache keyed by query identity.
///
/// Each key owns a slot that is filled at most once; concurrent readers of an
/// empty slot share a single fetch. Invalidation detaches the slot, so a fetch
/// still running against it can never repopulate the cache with old data.
/// Failed fetches leave the slot empty and the next reader retries.
pub struct QueryCache {
    slots: DashMap<QueryKey, Slot>,
    fetches: AtomicU64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            fetches: AtomicU64::new(0),
        }
    }

    /// Return the cached value for `key`, running `fetch` if there is none
    pub async fn fetch<F, Fut>(&self, key: QueryKey, fetch: F) -> Result<QueryData, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryData, GatewayError>>,
    {
        let slot = Arc::clone(
            self.slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .value(),
        );

        let data = slot
            .get_or_try_init(move || async move {
                self.fetches.fetch_add(1, Ordering::Relaxed);
                debug!(key = ?key, "Query cache miss, fetching");
                fetch().await
            })
            .await?;

        Ok(data.clone())
    }

    /// Cached value without fetching
    pub fn peek(&self, key: &QueryKey) -> Option<QueryData> {
        self.slots
            .get(key)
            .and_then(|slot| slot.value().get().cloned())
    }

    pub fn is_cached(&self, key: &QueryKey) -> bool {
        self.peek(key).is_some()
    }

    pub fn invalidate_key(&self, key: &QueryKey) {
        self.slots.remove(key);
    }

    /// Drop every key belonging to `family`
    pub fn invalidate_family(&self, family: QueryFamily) {
        self.slots.retain(|key, _| key.family() != family);
    }

    /// Apply the invalidations a successful mutation declares
    pub fn apply(&self, mutation: Mutation) {
        for family in mutation.invalidates() {
            self.invalidate_family(*family);
        }
        debug!(mutation = ?mutation, families = ?mutation.invalidates(), "Query cache invalidated");
    }

    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Number of fetches started since creation
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}
