//! services/client/src/stores/threads.rs
//!
//! The thread store: owns the conversation threads and the active selection.
//!
//! State lives in an immutable `ThreadSnapshot` that is copied, modified and
//! swapped in atomically on every mutation, each swap bumping `version`.
//! A send therefore never holds a lock across its remote call, and two
//! interleaved sends cannot overwrite each other's appends.

use crate::error::{ClientError, ClientResult, Notice};
use crate::stores::fallback::demo_reply;
use arc_swap::ArcSwap;
use nutri_chat_core::domain::{Message, MessageId, Thread, ThreadId};
use nutri_chat_core::image::ImageData;
use nutri_chat_core::ports::ChatService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

//=========================================================================================
// Snapshot
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct ThreadSnapshot {
    /// Incremented on every mutation.
    pub version: u64,
    /// Newest-created first.
    pub threads: Vec<Arc<Thread>>,
    pub active_thread_id: Option<ThreadId>,
    /// Number of sends waiting for a reply.
    pub pending_requests: usize,
    /// Advisory error from the last send that fell back to a demo reply.
    pub error: Option<String>,
}

impl ThreadSnapshot {
    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == id).map(|t| t.as_ref())
    }

    /// The selected thread, if the selection names one that exists.
    pub fn active_thread(&self) -> Option<&Thread> {
        self.active_thread_id.and_then(|id| self.thread(id))
    }

    pub fn loading(&self) -> bool {
        self.pending_requests > 0
    }

    /// Appends to the thread with `thread_id`; a missing thread is left alone.
    fn append(&mut self, thread_id: ThreadId, message: Message) -> bool {
        match self.threads.iter_mut().find(|t| t.id == thread_id) {
            Some(thread) => {
                *thread = Arc::new(thread.with_message(message));
                true
            }
            None => {
                debug!("Thread {} no longer exists, dropping message", thread_id);
                false
            }
        }
    }
}

/// How a call to [`ThreadStore::send_message`] concluded.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// No thread was active, so one was created and nothing was sent.
    /// The caller must send the message again.
    ThreadCreated(ThreadId),
    /// The remote service replied.
    Replied {
        thread_id: ThreadId,
        message_id: MessageId,
    },
    /// The remote call failed and a demo reply was appended instead.
    Fallback {
        thread_id: ThreadId,
        message_id: MessageId,
        notice: Notice,
    },
}

//=========================================================================================
// ThreadStore
//=========================================================================================

pub struct ThreadStore {
    chat: Arc<dyn ChatService>,
    fallback_delay: Duration,
    state: ArcSwap<ThreadSnapshot>,
    changes: watch::Sender<u64>,
}

impl ThreadStore {
    pub fn new(chat: Arc<dyn ChatService>, fallback_delay: Duration) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            chat,
            fallback_delay,
            state: ArcSwap::from_pointee(ThreadSnapshot::default()),
            changes,
        }
    }

    /// The current state. Later mutations never affect a snapshot already handed out.
    pub fn snapshot(&self) -> Arc<ThreadSnapshot> {
        self.state.load_full()
    }

    /// Receives the snapshot version after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    pub fn loading(&self) -> bool {
        self.state.load().loading()
    }

    pub fn error(&self) -> Option<String> {
        self.state.load().error.clone()
    }

    /// Prepends an empty thread and makes it active.
    pub fn create_thread(&self) -> ThreadId {
        let thread = Arc::new(Thread::new());
        let thread_id = thread.id;
        self.update(|state| {
            state.threads.insert(0, thread.clone());
            state.active_thread_id = Some(thread_id);
        });
        info!("Created thread {}", thread_id);
        thread_id
    }

    /// Selects `thread_id` without checking that it exists.
    pub fn select_thread(&self, thread_id: ThreadId) {
        self.update(|state| state.active_thread_id = Some(thread_id));
    }

    /// Removes a thread, clearing the selection if it was active. Missing ids are ignored.
    pub fn delete_thread(&self, thread_id: ThreadId) {
        if self.state.load().thread(thread_id).is_none() {
            return;
        }
        self.update(|state| {
            state.threads.retain(|t| t.id != thread_id);
            if state.active_thread_id == Some(thread_id) {
                state.active_thread_id = None;
            }
        });
        info!("Deleted thread {}", thread_id);
    }

    pub fn clear_error(&self) {
        self.update(|state| state.error = None);
    }

    /// Sends a user message in the active thread and appends the assistant's reply.
    ///
    /// The user message is visible in the snapshot before the remote call starts.
    /// When no thread is active, a thread is created and nothing is sent; see
    /// [`SendOutcome::ThreadCreated`].
    pub async fn send_message(
        &self,
        content: &str,
        image: Option<ImageData>,
    ) -> ClientResult<SendOutcome> {
        let content = content.trim();
        if content.is_empty() && image.is_none() {
            return Err(ClientError::validation("Message is empty"));
        }

        let active = self.state.load().active_thread().map(|t| t.id);
        let Some(thread_id) = active else {
            let thread_id = self.create_thread();
            info!("No active thread; created {} and skipped sending", thread_id);
            return Ok(SendOutcome::ThreadCreated(thread_id));
        };

        let has_image = image.is_some();
        let user_message = Message::from_user(content, image);
        let request_image = user_message.image.clone();
        self.update(|state| {
            state.append(thread_id, user_message.clone());
            state.pending_requests += 1;
            state.error = None;
        });
        let pending = PendingSend::new(self);

        match self
            .chat
            .send_message(thread_id, content, request_image.as_ref())
            .await
        {
            Ok(response) => {
                let reply = Message::from_assistant(response);
                let message_id = reply.id;
                pending.settle(|state| {
                    state.append(thread_id, reply.clone());
                });
                Ok(SendOutcome::Replied {
                    thread_id,
                    message_id,
                })
            }
            Err(e) => {
                warn!("Chat request failed, using demo response: {}", e);
                tokio::time::sleep(self.fallback_delay).await;

                let notice = Notice::BackendUnavailable;
                let reply = Message::from_assistant(demo_reply(has_image));
                let message_id = reply.id;
                pending.settle(|state| {
                    state.append(thread_id, reply.clone());
                    state.error = Some(notice.message().to_string());
                });
                Ok(SendOutcome::Fallback {
                    thread_id,
                    message_id,
                    notice,
                })
            }
        }
    }

    /// Applies `mutate` to a copy of the current snapshot and swaps it in,
    /// rerunning it if another mutation landed first.
    fn update<F>(&self, mut mutate: F)
    where
        F: FnMut(&mut ThreadSnapshot),
    {
        let previous = self.state.rcu(|current| {
            let mut next = ThreadSnapshot::clone(current);
            mutate(&mut next);
            next.version = current.version + 1;
            next
        });

        // Racing writers may publish out of order; never step the channel backwards.
        let version = previous.version + 1;
        self.changes.send_if_modified(|seen| {
            if version > *seen {
                *seen = version;
                true
            } else {
                false
            }
        });
    }
}

/// Holds one slot of `pending_requests` for an in-flight send.
///
/// Dropping it without `settle`, e.g. when the caller abandons the send
/// future, still releases the slot.
struct PendingSend<'a> {
    store: &'a ThreadStore,
    settled: bool,
}

impl<'a> PendingSend<'a> {
    fn new(store: &'a ThreadStore) -> Self {
        Self {
            store,
            settled: false,
        }
    }

    /// Releases the slot in the same swap as `mutate`.
    fn settle<F>(mut self, mut mutate: F)
    where
        F: FnMut(&mut ThreadSnapshot),
    {
        self.settled = true;
        self.store.update(|state| {
            mutate(state);
            state.pending_requests = state.pending_requests.saturating_sub(1);
        });
    }
}

impl Drop for PendingSend<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        debug!("Send abandoned before completion, releasing pending slot");
        self.store.update(|state| {
            state.pending_requests = state.pending_requests.saturating_sub(1);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nutri_chat_core::ports::{PortError, PortResult};

    struct EchoChat;

    #[async_trait]
    impl ChatService for EchoChat {
        async fn send_message(
            &self,
            _thread_id: ThreadId,
            content: &str,
            _image: Option<&ImageData>,
        ) -> PortResult<String> {
            Ok(format!("echo: {}", content))
        }
    }

    struct DownChat;

    #[async_trait]
    impl ChatService for DownChat {
        async fn send_message(
            &self,
            _thread_id: ThreadId,
            _content: &str,
            _image: Option<&ImageData>,
        ) -> PortResult<String> {
            Err(PortError::Unavailable("connection refused".into()))
        }
    }

    struct FailingChat(fn() -> PortError);

    #[async_trait]
    impl ChatService for FailingChat {
        async fn send_message(
            &self,
            _thread_id: ThreadId,
            _content: &str,
            _image: Option<&ImageData>,
        ) -> PortResult<String> {
            Err((self.0)())
        }
    }

    struct StalledChat;

    #[async_trait]
    impl ChatService for StalledChat {
        async fn send_message(
            &self,
            _thread_id: ThreadId,
            _content: &str,
            _image: Option<&ImageData>,
        ) -> PortResult<String> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok("too late".to_string())
        }
    }

    fn store(chat: impl ChatService + 'static) -> ThreadStore {
        ThreadStore::new(Arc::new(chat), Duration::ZERO)
    }

    #[test]
    fn create_thread_prepends_and_selects() {
        let store = store(EchoChat);
        let first = store.create_thread();
        let second = store.create_thread();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.threads[0].id, second);
        assert_eq!(snapshot.threads[1].id, first);
        assert_eq!(snapshot.active_thread_id, Some(second));
        assert_eq!(snapshot.version, 2);
    }

    #[test]
    fn deleting_active_thread_clears_selection() {
        let store = store(EchoChat);
        let kept = store.create_thread();
        let doomed = store.create_thread();

        store.delete_thread(doomed);
        let after_first = store.snapshot();
        store.delete_thread(doomed);
        let after_second = store.snapshot();

        assert_eq!(after_first.active_thread_id, None);
        assert_eq!(after_first.threads.len(), 1);
        assert_eq!(after_first.threads[0].id, kept);
        assert_eq!(after_second.version, after_first.version);
    }

    #[test]
    fn deleting_other_thread_keeps_selection() {
        let store = store(EchoChat);
        let other = store.create_thread();
        let active = store.create_thread();

        store.delete_thread(other);

        assert_eq!(store.snapshot().active_thread_id, Some(active));
    }

    #[test]
    fn selecting_unknown_id_resolves_to_nothing() {
        let store = store(EchoChat);
        store.create_thread();
        store.select_thread(uuid::Uuid::new_v4());

        assert!(store.snapshot().active_thread().is_none());
    }

    #[test]
    fn handed_out_snapshots_do_not_change() {
        let store = store(EchoChat);
        let before = store.snapshot();
        store.create_thread();

        assert!(before.threads.is_empty());
        assert_eq!(store.snapshot().threads.len(), 1);
    }

    #[tokio::test]
    async fn first_send_without_thread_only_creates_one() {
        let store = store(EchoChat);

        let outcome = store.send_message("hello", None).await.unwrap();

        let snapshot = store.snapshot();
        assert_eq!(outcome, SendOutcome::ThreadCreated(snapshot.threads[0].id));
        assert!(snapshot.threads[0].messages.is_empty());
        assert!(!snapshot.loading());
    }

    #[tokio::test]
    async fn reply_is_appended_after_user_message() {
        let store = store(EchoChat);
        let thread_id = store.create_thread();

        let outcome = store.send_message("  Is kale good?  ", None).await.unwrap();

        let snapshot = store.snapshot();
        let thread = snapshot.thread(thread_id).unwrap();
        assert_eq!(thread.title, "Is kale good?");
        assert_eq!(thread.messages.len(), 2);
        assert!(thread.messages[0].is_from_user);
        assert_eq!(thread.messages[1].content, "echo: Is kale good?");
        assert!(!thread.messages[1].is_from_user);
        assert!(matches!(outcome, SendOutcome::Replied { message_id, .. } if message_id == thread.messages[1].id));
        assert!(!snapshot.loading());
        assert_eq!(snapshot.error, None);
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let store = store(EchoChat);
        store.create_thread();

        let err = store.send_message("   ", None).await.unwrap_err();

        assert!(matches!(err, ClientError::Validation(_)));
        assert!(store.snapshot().threads[0].messages.is_empty());
    }

    #[tokio::test]
    async fn image_only_message_is_sent() {
        let store = store(DownChat);
        let thread_id = store.create_thread();
        let image = ImageData::from_bytes("image/png", b"label").unwrap();

        store.send_message("", Some(image.clone())).await.unwrap();

        let snapshot = store.snapshot();
        let thread = snapshot.thread(thread_id).unwrap();
        assert_eq!(thread.messages[0].image.as_ref(), Some(&image));
        assert!(thread.messages[1].content.contains("the nutrition label you uploaded"));
    }

    #[tokio::test]
    async fn fallback_sets_error_and_clear_error_resets_it() {
        let store = store(DownChat);
        store.create_thread();

        let outcome = store.send_message("Too much salt?", None).await.unwrap();
        assert!(matches!(outcome, SendOutcome::Fallback { notice: Notice::BackendUnavailable, .. }));
        assert_eq!(
            store.error().as_deref(),
            Some("Backend server is not available. Using demo responses.")
        );

        store.clear_error();
        assert_eq!(store.error(), None);
    }

    #[tokio::test]
    async fn subscribers_see_every_version() {
        let store = store(EchoChat);
        let mut changes = store.subscribe();
        store.create_thread();

        changes.changed().await.unwrap();
        assert_eq!(*changes.borrow_and_update(), 1);

        store.send_message("hi", None).await.unwrap();
        assert_eq!(*changes.borrow(), 3);
    }

    #[tokio::test]
    async fn error_status_and_bad_body_also_fall_back() {
        for failure in [
            (|| PortError::Status(500)) as fn() -> PortError,
            || PortError::InvalidResponse("missing field `response`".into()),
        ] {
            let store = store(FailingChat(failure));
            let thread_id = store.create_thread();

            let outcome = store.send_message("Is oat milk sweetened?", None).await.unwrap();

            let snapshot = store.snapshot();
            let thread = snapshot.thread(thread_id).unwrap();
            assert!(matches!(outcome, SendOutcome::Fallback { .. }));
            assert_eq!(thread.messages.len(), 2);
            assert!(thread.messages[1].content.contains("This is a demo response."));
            assert!(snapshot.error.is_some());
            assert!(!snapshot.loading());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_send_releases_loading() {
        let store = store(StalledChat);
        let thread_id = store.create_thread();

        let result =
            tokio::time::timeout(Duration::from_millis(100), store.send_message("hi", None)).await;
        assert!(result.is_err());

        let snapshot = store.snapshot();
        assert_eq!(snapshot.pending_requests, 0);
        assert!(!snapshot.loading());
        assert_eq!(snapshot.thread(thread_id).unwrap().messages.len(), 1);
    }
}
