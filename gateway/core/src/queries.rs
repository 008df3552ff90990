//! Registered Queries
//!
//! The canonical cache keys and per-query staleness for every read the
//! dashboard issues, plus [`AnalyticsQueries`], the typed cached façade
//! over the analytics gateway.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::cache::{CompositeStatus, Fetcher, QueryCache, QueryKey, QuerySpec};
use crate::context::AppContext;
use crate::error::ApiError;
use crate::gateway::{
    ActiveStudentsResponse, AnalyticsGateway, RecentStudentsResponse,
    StudentsByDepartmentResponse, TotalStudentsResponse,
};
use crate::notify::Notifier;

/// Staleness threshold for most analytics reads
pub const ANALYTICS_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Recent enrollments move faster and go stale sooner
pub const RECENT_STUDENTS_STALE_TIME: Duration = Duration::from_secs(2 * 60);

/// Default page size for recent-students reads
pub const DEFAULT_RECENT_LIMIT: u32 = 5;

/// Canonical key constructors, one per registered query
pub mod keys {
    use crate::cache::QueryKey;

    /// Prefix addressing the whole analytics domain
    #[must_use]
    pub fn analytics() -> QueryKey {
        QueryKey::new("analytics")
    }

    /// Total roster size
    #[must_use]
    pub fn total_students() -> QueryKey {
        analytics().push("total-students")
    }

    /// Roster by department
    #[must_use]
    pub fn students_by_department() -> QueryKey {
        analytics().push("students-by-department")
    }

    /// Recent enrollments, parameterized by page size
    #[must_use]
    pub fn recent_students(limit: u32) -> QueryKey {
        analytics().push("recent-students").push(limit)
    }

    /// Students active in the last seven days
    #[must_use]
    pub fn active_students() -> QueryKey {
        analytics().push("active-students")
    }

    /// Message history for one chat thread
    #[must_use]
    pub fn chat_history(thread_id: &str) -> QueryKey {
        QueryKey::new("chat").push("history").push(thread_id)
    }
}

/// Wrap a typed gateway call as a stored, re-invocable fetcher
fn fetcher<T, Fut, F>(call: F) -> Fetcher
where
    T: Serialize,
    Fut: std::future::Future<Output = Result<T, ApiError>> + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
{
    Arc::new(move || {
        let fut = call();
        Box::pin(async move {
            let response = fut.await?;
            serde_json::to_value(response)
                .map_err(|e| ApiError::transport(format!("Failed to encode cached value: {e}")))
        })
    })
}

fn decode_cached<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::transport(format!("Failed to decode cached value: {e}")))
}

/// Typed, cached reads for the analytics dashboard
#[derive(Clone)]
pub struct AnalyticsQueries {
    gateway: AnalyticsGateway,
    cache: QueryCache,
    notifier: Arc<dyn Notifier>,
    retry: u32,
}

impl AnalyticsQueries {
    /// Create from the shared context. The configured retry bound applies
    /// to every read issued through this façade.
    #[must_use]
    pub fn new(context: &AppContext) -> Self {
        Self {
            gateway: AnalyticsGateway::new(context.transport()),
            cache: context.cache().clone(),
            notifier: context.notifier(),
            retry: context.config().retry_attempts,
        }
    }

    /// Cached total roster size
    pub async fn total_students(&self) -> Result<TotalStudentsResponse, ApiError> {
        let spec = QuerySpec::new(keys::total_students())
            .with_stale_time(ANALYTICS_STALE_TIME)
            .with_retry(self.retry);
        let gateway = self.gateway.clone();
        let value = self
            .cache
            .fetch(&spec, fetcher(move || {
                let gateway = gateway.clone();
                async move { gateway.total_students().await }
            }))
            .await?;
        decode_cached(value)
    }

    /// Cached per-department breakdown
    pub async fn students_by_department(&self) -> Result<StudentsByDepartmentResponse, ApiError> {
        let spec = QuerySpec::new(keys::students_by_department())
            .with_stale_time(ANALYTICS_STALE_TIME)
            .with_retry(self.retry);
        let gateway = self.gateway.clone();
        let value = self
            .cache
            .fetch(&spec, fetcher(move || {
                let gateway = gateway.clone();
                async move { gateway.students_by_department().await }
            }))
            .await?;
        decode_cached(value)
    }

    /// Cached recent enrollments
    pub async fn recent_students(&self, limit: u32) -> Result<RecentStudentsResponse, ApiError> {
        let spec = QuerySpec::new(keys::recent_students(limit))
            .with_stale_time(RECENT_STUDENTS_STALE_TIME)
            .with_retry(self.retry);
        let gateway = self.gateway.clone();
        let value = self
            .cache
            .fetch(&spec, fetcher(move || {
                let gateway = gateway.clone();
                async move { gateway.recent_students(limit).await }
            }))
            .await?;
        decode_cached(value)
    }

    /// Cached seven-day activity
    pub async fn active_students(&self) -> Result<ActiveStudentsResponse, ApiError> {
        let spec = QuerySpec::new(keys::active_students())
            .with_stale_time(ANALYTICS_STALE_TIME)
            .with_retry(self.retry);
        let gateway = self.gateway.clone();
        let value = self
            .cache
            .fetch(&spec, fetcher(move || {
                let gateway = gateway.clone();
                async move { gateway.active_students_last_7_days().await }
            }))
            .await?;
        decode_cached(value)
    }

    /// The keys a full dashboard load reads
    #[must_use]
    pub fn dashboard_keys() -> Vec<QueryKey> {
        vec![
            keys::total_students(),
            keys::students_by_department(),
            keys::recent_students(DEFAULT_RECENT_LIMIT),
            keys::active_students(),
        ]
    }

    /// Derived dashboard status: loading if any constituent is fetching
    /// with no prior data, error if any constituent's latest attempt
    /// failed.
    #[must_use]
    pub fn status(&self) -> CompositeStatus {
        self.cache.composite_status(&Self::dashboard_keys())
    }

    /// Mark the whole analytics domain stale and tell the user
    pub fn refresh(&self) {
        self.cache.invalidate_prefix(&keys::analytics());
        self.notifier.success("Analytics data refreshed");
    }
}
