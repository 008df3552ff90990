//! Gateway Core - Headless API Client for the Campus Admin Backend
//!
//! This crate is the complete client-side engine for the campus admin
//! backend: transport, typed domain gateways, a stale-time query cache,
//! the write-path orchestrator, and the streaming chat session. It is
//! independent of any UI framework and can drive a TUI, web UI, desktop
//! shell, or run headless for testing and automation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         UI Surface                           │
//! │        (views poll queries, issue mutations, render          │
//! │             sessions, display notifications)                 │
//! └───────────────┬──────────────────────────┬───────────────────┘
//!                 │ reads                    │ writes
//! ┌───────────────┴──────────┐  ┌────────────┴───────────────────┐
//! │      AnalyticsQueries    │  │          Orchestrator          │
//! │  QueryCache (stale-time, │  │  validation · optimistic       │
//! │  coalescing, retry,      │  │  session updates · credential  │
//! │  invalidation)           │  │  persistence · notifications   │
//! └───────────────┬──────────┘  └────────────┬───────────────────┘
//! ┌───────────────┴──────────────────────────┴───────────────────┐
//! │         Gateways: Auth │ Chat │ Analytics (pure, typed)      │
//! └───────────────────────────────┬──────────────────────────────┘
//! ┌───────────────────────────────┴──────────────────────────────┐
//! │    HttpTransport: reqwest, error normalization, timeouts     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`AppContext`]: Shared dependencies wired once at startup
//! - [`Orchestrator`]: All write paths (auth, chat) with their side effects
//! - [`AnalyticsQueries`]: Cached, typed reads for the dashboard
//! - [`QueryCache`]: The stale-time read cache behind every query
//! - [`Session`]: One chat thread's ordered message sequence
//! - [`MessageAssembler`]: Streams an assistant reply into a session
//! - [`ApiError`]: The normalized error every layer speaks
//!
//! # Quick Start
//!
//! ```ignore
//! use gateway_core::{AppContext, ClientConfig, Orchestrator, Session};
//! use gateway_core::gateway::LoginCredentials;
//!
//! #[tokio::main]
//! async fn main() {
//!     let context = AppContext::new(ClientConfig::from_env());
//!     let orchestrator = Orchestrator::new(context.clone());
//!
//!     let credentials = LoginCredentials {
//!         email: "admin@campus.edu".into(),
//!         password: "secret".into(),
//!     };
//!     orchestrator.login(&credentials).await.unwrap();
//!
//!     let session = Session::with_generated_thread().into_shared();
//!     let response = orchestrator.send_chat(&session, "How many students?").await;
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`transport`]: HTTP transport and payload error-message extraction
//! - [`error`]: The [`ApiError`] taxonomy
//! - [`gateway`]: Typed domain gateways (auth, chat, analytics)
//! - [`cache`]: Stale-time query cache with coalescing and invalidation
//! - [`queries`]: Registered query keys and the cached analytics reads
//! - [`mutation`]: The write-path orchestrator
//! - [`session`]: Chat sessions and optimistic message sequences
//! - [`streaming`]: Fragment assembly for streamed assistant replies
//! - [`credentials`]: Credential persistence contract
//! - [`notify`]: User-notification sink
//! - [`config`]: Client configuration
//! - [`context`]: The shared [`AppContext`]

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod mutation;
pub mod notify;
pub mod queries;
pub mod session;
pub mod streaming;
pub mod transport;

// Re-exports for convenience
pub use cache::{
    CacheConfig, CompositeStatus, QueryCache, QueryKey, QueryObserver, QuerySpec, QueryState,
};
pub use config::ClientConfig;
pub use context::AppContext;
pub use credentials::{CredentialStore, KeyValueStore, MemoryStore};
pub use error::ApiError;
pub use gateway::{
    AnalyticsGateway, ApiEnvelope, AuthGateway, ChatGateway, ChatResponse, HistoryMessage,
    UserProfile,
};
pub use mutation::{MutationState, Orchestrator};
pub use notify::{LogNotifier, Notifier, NotifyLevel, RecordingNotifier};
pub use queries::AnalyticsQueries;
pub use session::{Message, MessageId, Role, Session, SharedSession};
pub use streaming::{Fragment, MessageAssembler, StreamHandle, StreamPhase};
pub use transport::{ApiRequest, HttpMethod, HttpTransport, Transport};
