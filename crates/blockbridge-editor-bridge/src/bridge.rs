//! EditorBridge - the native side of the embedded block editor.

use std::sync::{Arc, Weak};
use std::time::Duration;

use blockbridge_common::{BridgeError, EditorConfig};
use blockbridge_editor_core::{
    MediaFile, MediaId, MediaType, UploadRegistry, clamp_progress, strip_legacy_progress,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;
use tracing::{debug, error, warn};
use url::Url;
use web_time::Instant;

use crate::events::{EditorEvent, EditorListener, TrackableEvent};
use crate::lifecycle::{BridgeState, LifecycleCell, LifecycleEvent};
use crate::runtime::{
    EmbeddedRuntime, Fetched, RuntimeRequest, ViewOptions, ViewRoot, request_channel,
};

/// Per-session editor flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub html_mode: bool,
    pub new_post: bool,
    pub toolbar_expanded: bool,
    pub was_paused: bool,
    pub hide_action_bar_on_keyboard: bool,
}

/// What a request to switch editor modes did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    Switched,
    /// Media is uploading or an action is in progress; tell the user.
    BlockedWhileUploading,
    /// The flag flipped but the runtime had no view to switch.
    RuntimeNotReady,
}

/// Upload worker → editor notifications.
pub trait MediaUploadListener {
    fn on_media_upload_progress(&self, local_id: MediaId, progress: f32);

    fn on_media_upload_succeeded(&self, local_id: MediaId, media_file: &MediaFile);

    fn on_media_upload_failed(&self, local_id: MediaId, media_type: MediaType, message: &str);

    /// A late initial progress report for an upload the editor lost track of.
    fn on_media_upload_reattached(&self, local_id: MediaId, current_progress: f32);

    fn on_media_upload_retry(&self, local_id: MediaId, media_type: MediaType);
}

fn ensure_ready(
    lifecycle: &LifecycleCell,
    runtime: &dyn EmbeddedRuntime,
) -> Result<(), BridgeError> {
    if lifecycle.get().is_view_attached() && runtime.has_root_view() {
        Ok(())
    } else {
        Err(BridgeError::RuntimeNotReady)
    }
}

fn is_network_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Upload event sink handed to upload workers.
///
/// Holds the session weakly: once the bridge is dropped, events are ignored.
/// Cheap to clone and safe to use from any thread.
#[derive(Clone)]
pub struct UploadSink {
    uploads: Weak<UploadRegistry>,
    runtime: Weak<dyn EmbeddedRuntime>,
    lifecycle: Weak<LifecycleCell>,
}

impl UploadSink {
    /// Runtime to forward to, if the session is alive and its view is ready.
    fn ready_runtime(&self, op: &'static str) -> Option<Arc<dyn EmbeddedRuntime>> {
        let runtime = self.runtime.upgrade()?;
        let lifecycle = self.lifecycle.upgrade()?;
        match ensure_ready(&lifecycle, runtime.as_ref()) {
            Ok(()) => Some(runtime),
            Err(err) => {
                debug!(op, error = %err, "not forwarding upload event");
                None
            }
        }
    }

    fn registry(&self, local_id: MediaId) -> Option<Arc<UploadRegistry>> {
        let uploads = self.uploads.upgrade();
        if uploads.is_none() {
            debug!(local_id = %local_id, "upload event for a closed editor session");
        }
        uploads
    }
}

impl MediaUploadListener for UploadSink {
    fn on_media_upload_progress(&self, local_id: MediaId, progress: f32) {
        let Some(uploads) = self.registry(local_id) else {
            return;
        };
        uploads.update(local_id, progress);

        if let Some(runtime) = self.ready_runtime("media_file_upload_progress") {
            runtime.media_file_upload_progress(local_id, clamp_progress(progress));
        }
    }

    fn on_media_upload_succeeded(&self, local_id: MediaId, media_file: &MediaFile) {
        let Some(uploads) = self.registry(local_id) else {
            return;
        };
        uploads.remove(local_id);

        let Some(remote_id) = media_file.media_id else {
            warn!(local_id = %local_id, "upload succeeded without a remote media id");
            return;
        };

        if let Some(runtime) = self.ready_runtime("media_file_upload_succeeded") {
            runtime.media_file_upload_succeeded(
                local_id,
                media_file.file_url.as_deref().unwrap_or_default(),
                remote_id,
            );
        }
    }

    fn on_media_upload_failed(&self, local_id: MediaId, media_type: MediaType, message: &str) {
        let Some(uploads) = self.registry(local_id) else {
            return;
        };

        let err = BridgeError::UploadFailed {
            local_id: local_id.to_string(),
            message: message.to_string(),
        };
        error!(?media_type, error = %err, "media upload failed");

        if let Some(runtime) = self.ready_runtime("media_file_upload_failed") {
            runtime.media_file_upload_failed(local_id);
        }
        uploads.mark_failed(local_id);
    }

    fn on_media_upload_reattached(&self, local_id: MediaId, current_progress: f32) {
        let Some(uploads) = self.registry(local_id) else {
            return;
        };
        uploads.put(local_id, current_progress);

        if let Some(runtime) = self.ready_runtime("media_file_upload_progress") {
            runtime.media_file_upload_progress(local_id, clamp_progress(current_progress));
        }
    }

    fn on_media_upload_retry(&self, local_id: MediaId, media_type: MediaType) {
        let Some(uploads) = self.registry(local_id) else {
            return;
        };
        if uploads.retry(local_id) {
            debug!(local_id = %local_id, ?media_type, "retrying failed upload");
        }
        // TODO: ask the upload worker to restart the upload once it exposes a retry entry point
    }
}

/// Native side of one editing session.
///
/// Owns the runtime handle and the upload registry. Lifecycle and editing
/// calls come from the UI thread; upload events may arrive from anywhere
/// through [`EditorBridge::upload_sink`].
pub struct EditorBridge {
    runtime: Arc<dyn EmbeddedRuntime>,
    uploads: Arc<UploadRegistry>,
    lifecycle: Arc<LifecycleCell>,
    listener: Arc<dyn EditorListener>,
    sink: UploadSink,
    session: SessionState,
    fetch_timeout: Duration,
    text_changes: watch::Sender<Option<String>>,
    requests: Option<UnboundedReceiver<RuntimeRequest>>,
    created_at: Option<Instant>,
}

impl EditorBridge {
    pub fn new(
        runtime: Arc<dyn EmbeddedRuntime>,
        listener: Arc<dyn EditorListener>,
        session: SessionState,
        fetch_timeout: Duration,
    ) -> Self {
        let uploads = Arc::new(UploadRegistry::new());
        let lifecycle = Arc::new(LifecycleCell::default());
        let sink = UploadSink {
            uploads: Arc::downgrade(&uploads),
            runtime: Arc::downgrade(&runtime),
            lifecycle: Arc::downgrade(&lifecycle),
        };
        let (text_changes, _) = watch::channel(None);

        Self {
            runtime,
            uploads,
            lifecycle,
            listener,
            sink,
            session,
            fetch_timeout,
            text_changes,
            requests: None,
            created_at: None,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.lifecycle.get()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    pub fn uploads(&self) -> &Arc<UploadRegistry> {
        &self.uploads
    }

    pub fn upload_sink(&self) -> UploadSink {
        self.sink.clone()
    }

    /// Whether calls can reach the runtime right now.
    pub fn is_ready(&self) -> bool {
        ensure_ready(&self.lifecycle, self.runtime.as_ref()).is_ok()
    }

    fn ready_for(&self, op: &'static str) -> bool {
        match ensure_ready(&self.lifecycle, self.runtime.as_ref()) {
            Ok(()) => true,
            Err(err) => {
                debug!(op, state = %self.state(), error = %err, "skipping runtime call");
                false
            }
        }
    }

    // === Lifecycle ===

    pub fn on_create(&mut self, html_mode: bool) -> Result<(), BridgeError> {
        self.lifecycle.advance(LifecycleEvent::Create)?;
        self.session.html_mode = html_mode;
        self.created_at = Some(Instant::now());
        self.runtime.on_create();
        Ok(())
    }

    pub fn on_create_view(
        &mut self,
        view_root: ViewRoot,
        config: &EditorConfig,
    ) -> Result<(), BridgeError> {
        self.lifecycle.advance(LifecycleEvent::CreateView)?;

        let options = ViewOptions {
            view_root,
            html_mode: self.session.html_mode,
            debug: config.debug,
            build_from_source: config.build_from_source,
            is_new_post: self.session.new_post,
            toolbar_expanded: self.session.toolbar_expanded,
        };
        let (requests_tx, requests_rx) = request_channel();
        self.requests = Some(requests_rx);
        self.runtime.on_create_view(options, requests_tx);

        if let Some(created_at) = self.created_at {
            debug!(
                elapsed_ms = created_at.elapsed().as_millis() as u64,
                "visual editor startup"
            );
        }
        Ok(())
    }

    pub fn on_resume(&mut self) -> Result<(), BridgeError> {
        self.lifecycle.advance(LifecycleEvent::Resume)?;
        self.runtime.on_resume();
        Ok(())
    }

    pub fn on_pause(&mut self) -> Result<(), BridgeError> {
        self.lifecycle.advance(LifecycleEvent::Pause)?;
        self.session.was_paused = true;
        self.runtime.on_pause();
        Ok(())
    }

    /// Release the runtime root view. Pending fetches resolve through their timeout.
    pub fn on_destroy(&mut self) -> Result<(), BridgeError> {
        self.lifecycle.advance(LifecycleEvent::Destroy)?;
        self.requests = None;
        self.runtime.on_destroy();
        Ok(())
    }

    /// Next queued request from the runtime, if any. Call from the UI thread.
    pub fn next_runtime_request(&mut self) -> Option<RuntimeRequest> {
        self.requests.as_mut()?.try_recv().ok()
    }

    // === Title and content ===

    pub fn set_title(&self, title: Option<&str>) {
        let title = title.unwrap_or_default();
        if !self.ready_for("set_title") {
            return;
        }
        self.runtime.set_title(title);
    }

    /// Legacy upload-progress markup is stripped before the runtime sees it.
    pub fn set_content(&self, content: Option<&str>) {
        let content = content.unwrap_or_default();
        if !self.ready_for("set_content") {
            return;
        }
        self.runtime.set_content(&strip_legacy_progress(content));
    }

    /// Current title from the runtime. Blocks; call from a background thread.
    pub fn get_title(&self) -> Fetched<String> {
        if !self.ready_for("get_title") {
            return Fetched::Value(String::new());
        }
        let title = self.runtime.get_title(self.fetch_timeout);
        if title.is_timed_out() {
            error!(
                timeout_ms = self.fetch_timeout.as_millis() as u64,
                "timed out fetching title from editor"
            );
        }
        title
    }

    /// Current content from the runtime. Blocks; call from a background thread.
    pub fn get_content(&self, original: Option<&str>) -> Fetched<String> {
        let original = original.unwrap_or_default();
        if !self.ready_for("get_content") {
            return Fetched::Value(original.to_string());
        }
        let content = self.runtime.get_content(original, self.fetch_timeout);
        if content.is_timed_out() {
            error!(
                timeout_ms = self.fetch_timeout.as_millis() as u64,
                "timed out fetching content from editor"
            );
        }
        content
    }

    /// Title-or-content change notifications.
    pub fn title_or_content_changed(&self) -> watch::Receiver<Option<String>> {
        self.text_changes.subscribe()
    }

    pub fn after_text_changed(&self, text: impl Into<String>) {
        self.text_changes.send_replace(Some(text.into()));
    }

    // === Editor mode ===

    pub fn html_mode(&self) -> bool {
        self.session.html_mode
    }

    pub fn toggle_html_mode(&mut self) -> ToggleOutcome {
        self.session.html_mode = !self.session.html_mode;

        self.listener
            .on_event(EditorEvent::Trackable(TrackableEvent::HtmlButtonTapped));
        self.listener.on_event(EditorEvent::HtmlModeToggledInToolbar);

        if !self.uploads.is_empty() || self.is_action_in_progress() {
            warn!(
                uploading = self.uploads.len(),
                "not switching editor mode while media is uploading"
            );
            return ToggleOutcome::BlockedWhileUploading;
        }

        if !self.ready_for("toggle_editor_mode") {
            return ToggleOutcome::RuntimeNotReady;
        }
        self.runtime.toggle_editor_mode();
        ToggleOutcome::Switched
    }

    /// Always false: uploads are tracked in [`EditorBridge::uploads`] instead.
    pub fn is_uploading_media(&self) -> bool {
        false
    }

    pub fn is_action_in_progress(&self) -> bool {
        false
    }

    pub fn has_failed_media_uploads(&self) -> bool {
        self.uploads.has_failed()
    }

    // === Media ===

    /// Embed hosted media directly; local media goes in as an upload at zero progress.
    pub fn append_media_file(&self, media_file: &MediaFile, media_url: &str) {
        if is_network_url(media_url) {
            if self.ready_for("append_media_file") {
                self.runtime.append_media_file(media_url);
            }
            return;
        }

        let file_url = if media_url.starts_with("file://") {
            media_url.to_string()
        } else {
            format!("file://{media_url}")
        };
        if self.ready_for("append_upload_media_file") {
            self.runtime.append_upload_media_file(media_file.id, &file_url);
        }
        self.uploads.put(media_file.id, 0.0);
    }

    /// Re-send the last known progress of every in-flight upload.
    pub fn update_media_progress(&self) {
        if !self.ready_for("media_file_upload_progress") {
            return;
        }
        for (local_id, progress) in self.uploads.snapshot() {
            self.runtime.media_file_upload_progress(local_id, progress);
        }
    }

    pub fn show_dev_options_dialog(&self) {
        if self.ready_for("show_dev_options_dialog") {
            self.runtime.show_dev_options_dialog();
        }
    }
}

impl MediaUploadListener for EditorBridge {
    fn on_media_upload_progress(&self, local_id: MediaId, progress: f32) {
        self.sink.on_media_upload_progress(local_id, progress);
    }

    fn on_media_upload_succeeded(&self, local_id: MediaId, media_file: &MediaFile) {
        self.sink.on_media_upload_succeeded(local_id, media_file);
    }

    fn on_media_upload_failed(&self, local_id: MediaId, media_type: MediaType, message: &str) {
        self.sink.on_media_upload_failed(local_id, media_type, message);
    }

    fn on_media_upload_reattached(&self, local_id: MediaId, current_progress: f32) {
        self.sink.on_media_upload_reattached(local_id, current_progress);
    }

    fn on_media_upload_retry(&self, local_id: MediaId, media_type: MediaType) {
        self.sink.on_media_upload_retry(local_id, media_type);
    }
}
