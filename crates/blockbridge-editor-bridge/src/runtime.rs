//! Contract between the native bridge and the embedded editor runtime.
//!
//! The embedded runtime is the JavaScript-hosted block editor. It runs its
//! own dispatcher; everything here is fire-and-forget from the caller's point
//! of view except the title/content fetches, which block up to a timeout.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

use blockbridge_common::BridgeError;
use blockbridge_editor_core::{MediaId, RemoteMediaId};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Opaque handle of the native view the runtime mounts its root view into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewRoot(pub u64);

/// Everything the runtime needs to create its root view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewOptions {
    pub view_root: ViewRoot,
    pub html_mode: bool,
    pub debug: bool,
    pub build_from_source: bool,
    pub is_new_post: bool,
    pub toolbar_expanded: bool,
}

/// Requests the runtime makes of the native side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeRequest {
    /// The media library toolbar button was pressed.
    MediaLibraryButton,
    /// The "upload from device" button was pressed.
    UploadMediaButton,
    /// The "take a photo" button was pressed.
    CapturePhotoButton,
    /// The runtime reattached and wants the progress of in-flight uploads.
    QueryUploadProgress,
}

/// Sending half handed to the runtime in [`EmbeddedRuntime::on_create_view`].
///
/// Requests sent from the runtime dispatcher are drained on the UI thread.
#[derive(Clone, Debug)]
pub struct RuntimeRequestSender(UnboundedSender<RuntimeRequest>);

impl RuntimeRequestSender {
    /// Returns false once the session that owns the receiving side is gone.
    pub fn send(&self, request: RuntimeRequest) -> bool {
        self.0.send(request).is_ok()
    }
}

pub(crate) fn request_channel() -> (RuntimeRequestSender, UnboundedReceiver<RuntimeRequest>) {
    let (tx, rx) = unbounded_channel();
    (RuntimeRequestSender(tx), rx)
}

/// Result of a blocking fetch from the runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fetched<T> {
    Value(T),
    /// The runtime didn't answer in time. Transient; the caller may retry.
    TimedOut,
}

impl<T> Fetched<T> {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Fetched::TimedOut)
    }

    pub fn value(self) -> Option<T> {
        match self {
            Fetched::Value(value) => Some(value),
            Fetched::TimedOut => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Value(value) => Fetched::Value(f(value)),
            Fetched::TimedOut => Fetched::TimedOut,
        }
    }

    /// `TimedOut` becomes [`BridgeError::ContentFetchTimeout`] for `what`.
    pub fn into_result(self, what: &'static str) -> Result<T, BridgeError> {
        self.value()
            .ok_or(BridgeError::ContentFetchTimeout { what })
    }
}

impl<T: Default> Fetched<T> {
    pub fn unwrap_or_default(self) -> T {
        self.value().unwrap_or_default()
    }
}

/// Reply side of a pending fetch, answered from the runtime dispatcher.
#[derive(Debug)]
pub struct FetchSlot<T>(SyncSender<T>);

impl<T> FetchSlot<T> {
    /// Deliver the answer. Returns false if the waiter already gave up.
    pub fn fulfill(self, value: T) -> bool {
        self.0.try_send(value).is_ok()
    }
}

/// Waiting side of a pending fetch.
#[derive(Debug)]
pub struct FetchWait<T>(Receiver<T>);

impl<T> FetchWait<T> {
    /// Block until the slot is fulfilled or `timeout` elapses.
    ///
    /// A slot dropped without an answer is reported as a timeout as well.
    pub fn wait(self, timeout: Duration) -> Fetched<T> {
        match self.0.recv_timeout(timeout) {
            Ok(value) => Fetched::Value(value),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Fetched::TimedOut,
        }
    }
}

/// One-shot rendezvous for runtimes whose fetches complete on another thread.
pub fn fetch_channel<T>() -> (FetchSlot<T>, FetchWait<T>) {
    let (tx, rx) = mpsc::sync_channel(1);
    (FetchSlot(tx), FetchWait(rx))
}

/// The embedded editor runtime.
///
/// Implementations post work to their own dispatcher, so every method takes
/// `&self` and may be called from any thread. Only `get_title`/`get_content`
/// block.
pub trait EmbeddedRuntime: Send + Sync {
    fn on_create(&self);

    /// Mount the editor root view. `requests` carries button presses and
    /// reattach queries back to the native side.
    fn on_create_view(&self, options: ViewOptions, requests: RuntimeRequestSender);

    fn on_resume(&self);

    fn on_pause(&self);

    /// Release the root view.
    fn on_destroy(&self);

    /// Whether the root view is attached and can take calls.
    fn has_root_view(&self) -> bool;

    fn set_title(&self, title: &str);

    fn set_content(&self, content: &str);

    fn get_title(&self, timeout: Duration) -> Fetched<String>;

    /// `original` is what the runtime returns if it has no edits of its own.
    fn get_content(&self, original: &str, timeout: Duration) -> Fetched<String>;

    /// Switch between visual and HTML mode.
    fn toggle_editor_mode(&self);

    /// Embed already-hosted media.
    fn append_media_file(&self, url: &str);

    /// Embed local media that is still uploading.
    fn append_upload_media_file(&self, local_id: MediaId, file_url: &str);

    fn media_file_upload_progress(&self, local_id: MediaId, progress: f32);

    fn media_file_upload_succeeded(
        &self,
        local_id: MediaId,
        remote_url: &str,
        remote_id: RemoteMediaId,
    );

    fn media_file_upload_failed(&self, local_id: MediaId);

    fn show_dev_options_dialog(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_answered_from_other_thread() {
        let (slot, wait) = fetch_channel();
        let answer = std::thread::spawn(move || slot.fulfill("Hello".to_string()));

        assert_eq!(
            wait.wait(Duration::from_secs(5)),
            Fetched::Value("Hello".to_string())
        );
        assert!(answer.join().unwrap());
    }

    #[test]
    fn test_fetch_times_out() {
        let (slot, wait) = fetch_channel::<String>();
        assert!(wait.wait(Duration::from_millis(10)).is_timed_out());
        // The waiter is gone, a late answer is dropped.
        assert!(!slot.fulfill("late".to_string()));
    }

    #[test]
    fn test_fetch_slot_dropped() {
        let (slot, wait) = fetch_channel::<String>();
        drop(slot);
        assert_eq!(wait.wait(Duration::from_secs(5)), Fetched::TimedOut);
    }

    #[test]
    fn test_fetched_into_result() {
        assert_eq!(Fetched::Value(3).into_result("title").unwrap(), 3);
        let err = Fetched::<u8>::TimedOut.into_result("content").unwrap_err();
        assert!(matches!(
            err,
            BridgeError::ContentFetchTimeout { what: "content" }
        ));
        assert_eq!(Fetched::<String>::TimedOut.unwrap_or_default(), "");
    }
}
