//! Mutation Orchestrator
//!
//! Write-path coordination for auth and chat: client-side validation,
//! per-operation in-flight tracking, optimistic session updates with
//! rollback, credential persistence, cache writes and invalidation, and
//! outcome notifications. Gateways stay pure; every side effect of a
//! mutation lives here.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::context::AppContext;
use crate::error::ApiError;
use crate::gateway::{
    AuthGateway, ChatGateway, ChatResponse, LoginCredentials, RegisterCredentials,
    ResetPasswordRequest, UserProfile,
};
use crate::queries::keys;
use crate::session::SharedSession;
use crate::streaming::{word_fragments, MessageAssembler, StreamHandle};

const LOGIN_SUCCESS: &str = "Login successful!";
const LOGIN_FAILED: &str = "Login failed";
const LOGIN_ERROR_FALLBACK: &str = "Login failed. Please check your credentials.";
const REGISTER_SUCCESS: &str = "Registration successful!";
const REGISTER_FAILED: &str = "Registration failed";
const REGISTER_ERROR_FALLBACK: &str = "Registration failed. Please try again.";
const RESET_SUCCESS: &str = "Password reset successful!";
const RESET_FAILED: &str = "Password reset failed";
const RESET_ERROR_FALLBACK: &str = "Password reset failed. Please try again.";
const LOGOUT_SUCCESS: &str = "Logged out successfully";
const CHAT_SEND_FAILED: &str = "Failed to send message. Please try again.";

/// Observable state of one mutation kind: whether a call is in flight
/// and the error its latest completed call produced, if any.
#[derive(Default)]
pub struct MutationState {
    inflight: AtomicUsize,
    last_error: Mutex<Option<ApiError>>,
}

impl MutationState {
    /// Whether at least one call is currently in flight
    #[must_use]
    pub fn pending(&self) -> bool {
        self.inflight.load(Ordering::SeqCst) > 0
    }

    /// The error of the latest completed call, cleared on success
    #[must_use]
    pub fn last_error(&self) -> Option<ApiError> {
        self.last_error.lock().clone()
    }

    fn begin(&self) -> InflightGuard<'_> {
        self.inflight.fetch_add(1, Ordering::SeqCst);
        InflightGuard(self)
    }

    fn record<T>(&self, result: &Result<T, ApiError>) {
        *self.last_error.lock() = result.as_ref().err().cloned();
    }
}

struct InflightGuard<'a>(&'a MutationState);

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.0.inflight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The write-path coordinator. One per application; cheap accessors
/// expose the per-operation states for views to poll.
pub struct Orchestrator {
    context: Arc<AppContext>,
    auth: AuthGateway,
    chat: ChatGateway,
    login_state: MutationState,
    register_state: MutationState,
    reset_state: MutationState,
    chat_state: MutationState,
}

impl Orchestrator {
    /// Create an orchestrator over the shared context
    #[must_use]
    pub fn new(context: Arc<AppContext>) -> Self {
        let auth = AuthGateway::new(context.transport());
        let chat = ChatGateway::new(context.transport());
        Self {
            context,
            auth,
            chat,
            login_state: MutationState::default(),
            register_state: MutationState::default(),
            reset_state: MutationState::default(),
            chat_state: MutationState::default(),
        }
    }

    /// State of the login mutation
    #[must_use]
    pub fn login_state(&self) -> &MutationState {
        &self.login_state
    }

    /// State of the register mutation
    #[must_use]
    pub fn register_state(&self) -> &MutationState {
        &self.register_state
    }

    /// State of the password-reset mutation
    #[must_use]
    pub fn reset_state(&self) -> &MutationState {
        &self.reset_state
    }

    /// State of the chat-send mutation
    #[must_use]
    pub fn chat_state(&self) -> &MutationState {
        &self.chat_state
    }

    /// Log into an existing account.
    ///
    /// On domain success the credential pair is persisted (when the
    /// backend issued a token) and a success notification is emitted
    /// with the backend's message. Every failure path notifies with a
    /// user-facing message and leaves stored credentials untouched.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<UserProfile, ApiError> {
        let _guard = self.login_state.begin();
        let result = self.login_inner(credentials).await;
        self.login_state.record(&result);
        result
    }

    async fn login_inner(&self, credentials: &LoginCredentials) -> Result<UserProfile, ApiError> {
        credentials.validate()?;
        let envelope = match self.auth.login(credentials).await {
            Ok(envelope) => envelope,
            Err(error) => {
                self.context
                    .notifier()
                    .error(&error.user_message(LOGIN_ERROR_FALLBACK));
                return Err(error);
            }
        };
        if !envelope.is_success() {
            let error = ApiError::domain(envelope.message_or(LOGIN_FAILED));
            self.context.notifier().error(error.message());
            return Err(error);
        }
        let profile = envelope.data.clone().unwrap_or_default();
        if let Some(token) = &profile.token {
            self.context.credentials().persist(token, &profile);
        }
        self.context
            .notifier()
            .success(envelope.message_or(LOGIN_SUCCESS));
        Ok(profile)
    }

    /// Register a new account. Mirrors [`Orchestrator::login`], including
    /// credential persistence when the backend issues a token on signup.
    pub async fn register(
        &self,
        credentials: &RegisterCredentials,
    ) -> Result<UserProfile, ApiError> {
        let _guard = self.register_state.begin();
        let result = self.register_inner(credentials).await;
        self.register_state.record(&result);
        result
    }

    async fn register_inner(
        &self,
        credentials: &RegisterCredentials,
    ) -> Result<UserProfile, ApiError> {
        credentials.validate()?;
        let envelope = match self.auth.register(credentials).await {
            Ok(envelope) => envelope,
            Err(error) => {
                self.context
                    .notifier()
                    .error(&error.user_message(REGISTER_ERROR_FALLBACK));
                return Err(error);
            }
        };
        if !envelope.is_success() {
            let error = ApiError::domain(envelope.message_or(REGISTER_FAILED));
            self.context.notifier().error(error.message());
            return Err(error);
        }
        let profile = envelope.data.clone().unwrap_or_default();
        if let Some(token) = &profile.token {
            self.context.credentials().persist(token, &profile);
        }
        self.context
            .notifier()
            .success(envelope.message_or(REGISTER_SUCCESS));
        Ok(profile)
    }

    /// Replace an account's password. No credentials are persisted; the
    /// user logs in again with the new password.
    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<(), ApiError> {
        let _guard = self.reset_state.begin();
        let result = self.reset_inner(request).await;
        self.reset_state.record(&result);
        result
    }

    async fn reset_inner(&self, request: &ResetPasswordRequest) -> Result<(), ApiError> {
        request.validate()?;
        let envelope = match self.auth.reset_password(request).await {
            Ok(envelope) => envelope,
            Err(error) => {
                self.context
                    .notifier()
                    .error(&error.user_message(RESET_ERROR_FALLBACK));
                return Err(error);
            }
        };
        if !envelope.is_success() {
            let error = ApiError::domain(envelope.message_or(RESET_FAILED));
            self.context.notifier().error(error.message());
            return Err(error);
        }
        self.context
            .notifier()
            .success(envelope.message_or(RESET_SUCCESS));
        Ok(())
    }

    /// End the authenticated session: drop the stored credential pair,
    /// empty the query cache, and notify. Purely local; no request is
    /// issued.
    pub fn logout(&self) {
        self.context.credentials().clear();
        self.context.cache().clear();
        self.context.notifier().success(LOGOUT_SUCCESS);
    }

    /// Send one chat message.
    ///
    /// The trimmed input is appended to the session optimistically before
    /// the request goes out. On success the backend's history replaces
    /// the local sequence, the thread's cached history is overwritten,
    /// and the analytics domain is invalidated (chat activity moves its
    /// numbers). On failure the provisional message is rolled back.
    pub async fn send_chat(
        &self,
        session: &SharedSession,
        input: &str,
    ) -> Result<ChatResponse, ApiError> {
        let _guard = self.chat_state.begin();
        let result = self.send_chat_inner(session, input).await;
        self.chat_state.record(&result);
        result
    }

    async fn send_chat_inner(
        &self,
        session: &SharedSession,
        input: &str,
    ) -> Result<ChatResponse, ApiError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ApiError::validation("Message cannot be empty"));
        }

        let (thread_id, provisional) = {
            let mut guard = session.lock();
            (guard.thread_id().to_string(), guard.push_user(trimmed))
        };

        match self.chat.send_message(&thread_id, trimmed).await {
            Ok(response) => {
                session
                    .lock()
                    .reconcile(&response.thread_id, &response.history);
                self.record_history(&response);
                Ok(response)
            }
            Err(error) => {
                session.lock().remove(&provisional);
                self.context.notifier().error(CHAT_SEND_FAILED);
                Err(error)
            }
        }
    }

    /// Send one chat message and stream the assistant's reply into the
    /// session word by word.
    ///
    /// The backend responds with the complete reply; this reconciles the
    /// session against the history minus that final reply, then replays
    /// the reply through the assembler so the view sees it arrive
    /// incrementally. Once the returned handle settles, the session
    /// matches the authoritative history exactly.
    pub async fn send_chat_streaming(
        &self,
        session: &SharedSession,
        input: &str,
        word_delay: Duration,
    ) -> Result<StreamHandle, ApiError> {
        let _guard = self.chat_state.begin();
        let result = self.send_chat_streaming_inner(session, input, word_delay).await;
        self.chat_state.record(&result);
        result
    }

    async fn send_chat_streaming_inner(
        &self,
        session: &SharedSession,
        input: &str,
        word_delay: Duration,
    ) -> Result<StreamHandle, ApiError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ApiError::validation("Message cannot be empty"));
        }

        let (thread_id, provisional) = {
            let mut guard = session.lock();
            (guard.thread_id().to_string(), guard.push_user(trimmed))
        };

        let response = match self.chat.send_message(&thread_id, trimmed).await {
            Ok(response) => response,
            Err(error) => {
                session.lock().remove(&provisional);
                self.context.notifier().error(CHAT_SEND_FAILED);
                return Err(error);
            }
        };

        // Reconcile against everything but the reply itself; the reply
        // then arrives through the assembler.
        let mut prior = response.history.clone();
        if prior
            .last()
            .is_some_and(|m| m.role == "assistant" && m.content == response.response)
        {
            prior.pop();
        }
        session.lock().reconcile(&response.thread_id, &prior);
        self.record_history(&response);

        let fragments = word_fragments(&response.response, word_delay);
        Ok(MessageAssembler::spawn(
            Arc::clone(session),
            fragments,
            self.context.notifier(),
        ))
    }

    fn record_history(&self, response: &ChatResponse) {
        if let Ok(history) = serde_json::to_value(&response.history) {
            self.context
                .cache()
                .put(keys::chat_history(&response.thread_id), history);
        }
        self.context.cache().invalidate_prefix(&keys::analytics());
    }
}
