//! Assembler Implementation
//!
//! The assembler is a task consuming a fragment channel and mutating the
//! session's single in-flight assistant message. Phase changes publish on
//! a watch channel so a consumer can re-render on every fragment.
//!
//! State machine: `Idle -> Sending -> Streaming -> Settled` on success,
//! `-> Failed` on a fragment-source error. Both terminal states are final.
//! Cancellation (explicit, or by dropping the handle) stops fragment
//! application and withdraws the in-flight message; nothing is committed
//! after teardown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::notify::Notifier;
use crate::session::SharedSession;

/// One increment of a streamed assistant reply
#[derive(Clone, Debug)]
pub enum Fragment {
    /// One chunk of reply text
    Text(String),
    /// The reply is complete
    Done,
    /// The fragment source failed
    Error(String),
}

/// Assembly lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamPhase {
    /// Not started
    Idle,
    /// Request issued, no fragments yet
    Sending,
    /// Fragments arriving
    Streaming,
    /// Final message committed
    Settled,
    /// Assembly aborted, partial buffer discarded
    Failed,
}

impl StreamPhase {
    /// Whether the phase is final
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Failed)
    }
}

/// Handle held by the consuming view.
///
/// Dropping the handle is teardown: the assembler stops applying
/// fragments and withdraws the in-flight message.
pub struct StreamHandle {
    phase: watch::Receiver<StreamPhase>,
    cancel: watch::Sender<bool>,
    _task: JoinHandle<()>,
}

impl StreamHandle {
    /// Current phase
    #[must_use]
    pub fn phase(&self) -> StreamPhase {
        *self.phase.borrow()
    }

    /// Subscribe to phase changes; every applied fragment is announced.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StreamPhase> {
        self.phase.clone()
    }

    /// Stop applying fragments and withdraw the in-flight message
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Wait until the assembly reaches a terminal phase
    pub async fn wait(&mut self) -> StreamPhase {
        loop {
            let phase = *self.phase.borrow();
            if phase.is_terminal() {
                return phase;
            }
            if self.phase.changed().await.is_err() {
                return *self.phase.borrow();
            }
        }
    }
}

/// Assembles fragments into the session's in-flight assistant message
pub struct MessageAssembler;

impl MessageAssembler {
    /// Spawn the assembly task for one reply.
    ///
    /// The session transitions through `begin_streaming` on the first
    /// fragment, `append_fragment` for each one after, and either
    /// `commit_streaming` (on `Done` or clean channel close) or
    /// `abort_streaming` (on error or cancellation).
    pub fn spawn(
        session: SharedSession,
        mut fragments: mpsc::Receiver<Fragment>,
        notifier: Arc<dyn Notifier>,
    ) -> StreamHandle {
        let (phase_tx, phase_rx) = watch::channel(StreamPhase::Sending);
        let (cancel_tx, mut cancel_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut received_any = false;
            loop {
                let fragment = tokio::select! {
                    fragment = fragments.recv() => fragment,
                    // Fires on explicit cancel and on handle drop alike.
                    _ = cancel_rx.changed() => {
                        session.lock().abort_streaming();
                        let _ = phase_tx.send(StreamPhase::Failed);
                        return;
                    }
                };

                match fragment {
                    Some(Fragment::Text(text)) => {
                        {
                            let mut session = session.lock();
                            if !received_any {
                                session.begin_streaming();
                                received_any = true;
                            }
                            session.append_fragment(&text);
                        }
                        // Announce every fragment so observers re-render.
                        let _ = phase_tx.send(StreamPhase::Streaming);
                    }
                    Some(Fragment::Done) | None => {
                        if received_any {
                            session.lock().commit_streaming();
                        }
                        let _ = phase_tx.send(StreamPhase::Settled);
                        return;
                    }
                    Some(Fragment::Error(error)) => {
                        session.lock().abort_streaming();
                        notifier.error(&error);
                        let _ = phase_tx.send(StreamPhase::Failed);
                        return;
                    }
                }
            }
        });

        StreamHandle {
            phase: phase_rx,
            cancel: cancel_tx,
            _task: task,
        }
    }
}

/// Fragment source that replays a complete reply as whitespace-separated
/// words, with a fixed delay between them. `Duration::ZERO` replays as
/// fast as the channel drains.
#[must_use]
pub fn word_fragments(text: &str, delay: Duration) -> mpsc::Receiver<Fragment> {
    let (tx, rx) = mpsc::channel(64);
    let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    tokio::spawn(async move {
        for word in words {
            if tx.send(Fragment::Text(word)).await.is_err() {
                return;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        let _ = tx.send(Fragment::Done).await;
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{NotifyLevel, RecordingNotifier};
    use crate::session::Session;

    fn recording() -> Arc<RecordingNotifier> {
        Arc::new(RecordingNotifier::new())
    }

    #[tokio::test]
    async fn test_fragments_build_space_separated_content() {
        let session = Session::new("t1").into_shared();
        let (tx, rx) = mpsc::channel(8);
        let mut handle = MessageAssembler::spawn(Arc::clone(&session), rx, recording());
        let mut phases = handle.subscribe();

        tx.send(Fragment::Text("Hi".to_string())).await.unwrap();
        phases.changed().await.unwrap();
        assert_eq!(handle.phase(), StreamPhase::Streaming);
        assert_eq!(session.lock().streaming_content(), Some("Hi"));

        tx.send(Fragment::Text("there".to_string())).await.unwrap();
        phases.changed().await.unwrap();
        assert_eq!(session.lock().streaming_content(), Some("Hi there"));

        drop(tx);
        assert_eq!(handle.wait().await, StreamPhase::Settled);

        let session = session.lock();
        assert_eq!(session.len(), 1);
        let message = &session.messages()[0];
        assert_eq!(message.content, "Hi there");
        assert!(!message.streaming);
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn test_done_commits_exactly_one_message() {
        let session = Session::new("t1").into_shared();
        let (tx, rx) = mpsc::channel(8);
        let mut handle = MessageAssembler::spawn(Arc::clone(&session), rx, recording());

        tx.send(Fragment::Text("only".to_string())).await.unwrap();
        tx.send(Fragment::Done).await.unwrap();

        assert_eq!(handle.wait().await, StreamPhase::Settled);
        assert_eq!(session.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_error_discards_partial_and_notifies() {
        let session = Session::new("t1").into_shared();
        let notifier = recording();
        let (tx, rx) = mpsc::channel(8);
        let mut handle =
            MessageAssembler::spawn(Arc::clone(&session), rx, Arc::clone(&notifier) as _);

        tx.send(Fragment::Text("partial".to_string())).await.unwrap();
        tx.send(Fragment::Error("stream broke".to_string()))
            .await
            .unwrap();

        assert_eq!(handle.wait().await, StreamPhase::Failed);
        assert!(session.lock().is_empty(), "partial buffer discarded");
        assert_eq!(
            notifier.messages_at(NotifyLevel::Error),
            vec!["stream broke"]
        );
    }

    #[tokio::test]
    async fn test_cancel_stops_application_and_commits_nothing() {
        let session = Session::new("t1").into_shared();
        let (tx, rx) = mpsc::channel(8);
        let mut handle = MessageAssembler::spawn(Arc::clone(&session), rx, recording());
        let mut phases = handle.subscribe();

        tx.send(Fragment::Text("before".to_string())).await.unwrap();
        phases.changed().await.unwrap();
        assert!(session.lock().is_streaming());

        handle.cancel();
        // Fragments after teardown must not be applied.
        let _ = tx.send(Fragment::Text("after".to_string())).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let session = session.lock();
        assert!(session.is_empty());
        assert!(!session.is_streaming());
    }

    #[tokio::test]
    async fn test_handle_drop_is_teardown() {
        let session = Session::new("t1").into_shared();
        let (tx, rx) = mpsc::channel(8);
        let handle = MessageAssembler::spawn(Arc::clone(&session), rx, recording());
        let mut phases = handle.subscribe();

        tx.send(Fragment::Text("partial".to_string())).await.unwrap();
        phases.changed().await.unwrap();

        drop(handle);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(session.lock().is_empty(), "no commit after the view is gone");
    }

    #[tokio::test]
    async fn test_empty_stream_settles_without_message() {
        let session = Session::new("t1").into_shared();
        let (tx, rx) = mpsc::channel(8);
        let mut handle = MessageAssembler::spawn(Arc::clone(&session), rx, recording());

        drop(tx);
        assert_eq!(handle.wait().await, StreamPhase::Settled);
        assert!(session.lock().is_empty());
    }

    #[tokio::test]
    async fn test_word_fragments_replay_in_order() {
        let session = Session::new("t1").into_shared();
        let rx = word_fragments("Hello campus admin", Duration::ZERO);
        let mut handle = MessageAssembler::spawn(Arc::clone(&session), rx, recording());

        assert_eq!(handle.wait().await, StreamPhase::Settled);
        assert_eq!(session.lock().messages()[0].content, "Hello campus admin");
    }
}
