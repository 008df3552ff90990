//! Application Context
//!
//! All process-wide client state, the credential store and the query
//! cache included, lives in one explicit context object rather than in
//! ambient globals. It is wired at construction and passed to gateways
//! and the orchestrator. Initialized empty at startup; the orchestrator
//! clears it on logout.

use std::sync::Arc;

use crate::cache::{CacheConfig, QueryCache};
use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::notify::{LogNotifier, Notifier};
use crate::transport::{HttpTransport, Transport};

/// Process-wide client state, created once at startup
pub struct AppContext {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    cache: QueryCache,
    credentials: CredentialStore,
    notifier: Arc<dyn Notifier>,
}

impl AppContext {
    /// Create a context with the production transport, an in-memory
    /// credential store, and tracing-backed notifications.
    #[must_use]
    pub fn new(config: ClientConfig) -> Arc<Self> {
        let transport = Arc::new(HttpTransport::new(&config));
        Self::with_parts(
            config,
            transport,
            CredentialStore::in_memory(),
            Arc::new(LogNotifier),
        )
    }

    /// Create a context from explicit collaborators. This is the seam
    /// tests and embedding shells use to substitute transport, storage,
    /// or notification delivery.
    pub fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        credentials: CredentialStore,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        let cache = QueryCache::new(CacheConfig {
            retry_delay: config.retry_delay,
        });
        Arc::new(Self {
            config,
            transport,
            cache,
            credentials,
            notifier,
        })
    }

    /// Connection settings
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The transport shared by every gateway
    #[must_use]
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    /// The process-wide query cache
    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// The persisted credential pair
    #[must_use]
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// The notification sink
    #[must_use]
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }
}
