//! Host screen integration.
//!
//! `EditorHostController` is what a composing screen talks to. It owns the
//! [`EditorBridge`], routes runtime button presses to the host listener,
//! gates photo capture behind permissions, and manages the action bar around
//! the soft keyboard.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use blockbridge_common::{BridgeError, EditorConfig};
use blockbridge_editor_core::{MediaFile, MediaId, MediaType, UploadRegistry};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::bridge::{EditorBridge, MediaUploadListener, SessionState, ToggleOutcome, UploadSink};
use crate::events::{EditorEvent, EditorListener, Toast, TrackableEvent};
use crate::runtime::{EmbeddedRuntime, RuntimeRequest, ViewRoot};

pub const CAPTURE_PHOTO_PERMISSION_REQUEST_CODE: u32 = 101;

/// Work to run on the UI thread.
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Kind of hardware keyboard attached, if any.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Keyboard {
    #[default]
    NoKeys,
    Qwerty,
    TwelveKey,
}

/// Display configuration of the host screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostConfiguration {
    pub orientation: Orientation,
    pub keyboard: Keyboard,
    /// Large tablets in landscape have room for the action bar and the keyboard.
    pub large_tablet_landscape: bool,
}

impl HostConfiguration {
    pub fn is_landscape(&self) -> bool {
        self.orientation == Orientation::Landscape
    }

    pub fn has_hardware_keyboard(&self) -> bool {
        self.keyboard != Keyboard::NoKeys
    }

    /// Landscape on anything smaller than a large tablet.
    pub fn hides_action_bar_for_keyboard(&self) -> bool {
        self.is_landscape() && !self.large_tablet_landscape
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchAction {
    Down,
    Move,
    Up,
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuItem {
    /// Developer options of the embedded runtime.
    Debug,
    Other(u32),
}

/// Visibility of the editor's options menu items.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptionsMenu {
    pub debug_visible: bool,
}

pub trait ActionBar: Send + Sync {
    fn is_showing(&self) -> bool;
    fn show(&self);
    fn hide(&self);
}

/// Receives media dragged onto the editor.
pub trait DragAndDropListener: Send + Sync {
    fn on_media_dropped(&self, uris: &[String]);
}

/// Platform services of the screen hosting the editor.
pub trait EditorHost: Send + Sync {
    fn configuration(&self) -> HostConfiguration;

    /// The screen's action bar, if it has one.
    fn action_bar(&self) -> Option<Arc<dyn ActionBar>>;

    fn show_toast(&self, toast: Toast);

    fn show_implicit_keyboard(&self);

    /// Returns true if camera and storage permissions are granted. Otherwise
    /// requests them under `request_code` and returns false; the answer comes
    /// back through [`EditorHostController::on_request_permissions_result`].
    fn check_and_request_camera_and_storage_permissions(&self, request_code: u32) -> bool;

    fn run_on_ui_thread(&self, task: UiTask);

    fn post_delayed(&self, delay: Duration, task: UiTask);

    fn invalidate_options_menu(&self);

    /// Hosts must accept dropped media; `None` is a contract violation.
    fn drag_and_drop_listener(&self) -> Option<Arc<dyn DragAndDropListener>>;

    /// Called once the editor view exists, for hosts that inject dependencies into it.
    fn initialize_editor(&self) {}
}

/// Arguments a composing session starts from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionArgs {
    pub title: String,
    pub content: String,
    pub is_new_post: bool,
    pub toolbar_expanded: bool,
}

/// State that survives transient reconfiguration of the host screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState {
    #[serde(rename = "html-mode-enabled")]
    pub html_mode_enabled: bool,
}

/// Glue between a host screen and its editor bridge.
pub struct EditorHostController {
    bridge: EditorBridge,
    config: EditorConfig,
    args: SessionArgs,
    listener: Arc<dyn EditorListener>,
    host: Option<Arc<dyn EditorHost>>,
    drag_and_drop: Option<Arc<dyn DragAndDropListener>>,
    /// Bumped to cancel pending options-menu invalidations.
    menu_generation: Arc<AtomicU64>,
}

impl EditorHostController {
    pub fn new(
        args: SessionArgs,
        config: EditorConfig,
        runtime: Arc<dyn EmbeddedRuntime>,
        listener: Arc<dyn EditorListener>,
    ) -> Self {
        let session = SessionState {
            new_post: args.is_new_post,
            toolbar_expanded: args.toolbar_expanded || config.toolbar_expanded,
            ..SessionState::default()
        };
        let bridge = EditorBridge::new(
            runtime,
            Arc::clone(&listener),
            session,
            config.fetch_timeout(),
        );

        Self {
            bridge,
            config,
            args,
            listener,
            host: None,
            drag_and_drop: None,
            menu_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn bridge(&self) -> &EditorBridge {
        &self.bridge
    }

    pub fn session(&self) -> &SessionState {
        self.bridge.session()
    }

    // === Attachment ===

    /// Attach to a host screen. Fails if the host breaks the editor's contract.
    pub fn attach(&mut self, host: Arc<dyn EditorHost>) -> Result<(), BridgeError> {
        let drag_and_drop = host
            .drag_and_drop_listener()
            .ok_or(BridgeError::HostContract {
                contract: "DragAndDropListener",
            })?;

        self.drag_and_drop = Some(drag_and_drop);
        self.host = Some(host);
        Ok(())
    }

    pub fn detach(&mut self) {
        self.host = None;
        self.drag_and_drop = None;
        self.menu_generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_attached(&self) -> bool {
        self.host.is_some()
    }

    fn host(&self) -> Result<&Arc<dyn EditorHost>, BridgeError> {
        self.host.as_ref().ok_or(BridgeError::NotAttached)
    }

    // === Lifecycle ===

    pub fn on_create(&mut self, saved: Option<&SavedState>) -> Result<(), BridgeError> {
        let html_mode = saved.is_some_and(|saved| saved.html_mode_enabled);
        self.bridge.on_create(html_mode)
    }

    pub fn on_create_view(&mut self, view_root: ViewRoot) -> Result<(), BridgeError> {
        let host = Arc::clone(self.host()?);
        self.bridge.on_create_view(view_root, &self.config)?;

        host.initialize_editor();

        if self.bridge.is_ready() {
            self.bridge.set_title(Some(&self.args.title));
            self.bridge.set_content(Some(&self.args.content));
        }

        self.listener.on_event(EditorEvent::Initialized);

        if self.args.is_new_post {
            host.show_implicit_keyboard();
        }
        Ok(())
    }

    pub fn on_resume(&mut self) -> Result<(), BridgeError> {
        self.bridge.on_resume()?;

        // Coming back in landscape the keyboard reappears even if it was
        // hidden before the pause.
        let was_paused = self.bridge.session().was_paused;
        if was_paused
            && self
                .host
                .as_ref()
                .is_some_and(|host| host.configuration().hides_action_bar_for_keyboard())
        {
            self.bridge.session_mut().hide_action_bar_on_keyboard = true;
            self.hide_action_bar_if_needed();
        }
        Ok(())
    }

    pub fn on_pause(&mut self) -> Result<(), BridgeError> {
        self.bridge.on_pause()
    }

    pub fn on_destroy(&mut self) -> Result<(), BridgeError> {
        self.menu_generation.fetch_add(1, Ordering::AcqRel);
        self.bridge.on_destroy()
    }

    pub fn on_save_instance_state(&self) -> SavedState {
        SavedState {
            html_mode_enabled: self.bridge.html_mode(),
        }
    }

    pub fn on_configuration_changed(&mut self, configuration: HostConfiguration) {
        if configuration.hides_action_bar_for_keyboard() {
            self.bridge.session_mut().hide_action_bar_on_keyboard = true;
            self.hide_action_bar_if_needed();
        } else {
            self.bridge.session_mut().hide_action_bar_on_keyboard = false;
            self.show_action_bar_if_needed();
        }
    }

    /// A touch on the editor surface. Never consumes the event.
    pub fn on_touch(&mut self, action: TouchAction) -> bool {
        let landscape = self
            .host
            .as_ref()
            .is_some_and(|host| host.configuration().is_landscape());
        if action == TouchAction::Up && landscape {
            self.bridge.session_mut().hide_action_bar_on_keyboard = true;
            self.hide_action_bar_if_needed();
        }
        false
    }

    /// Hide unless a hardware keyboard is attached or the bar is already hidden.
    fn hide_action_bar_if_needed(&self) {
        let Some(host) = &self.host else {
            return;
        };
        let Some(action_bar) = host.action_bar() else {
            return;
        };
        if !host.configuration().has_hardware_keyboard()
            && self.bridge.session().hide_action_bar_on_keyboard
            && action_bar.is_showing()
        {
            action_bar.hide();
        }
    }

    fn show_action_bar_if_needed(&self) {
        let Some(action_bar) = self.host.as_ref().and_then(|host| host.action_bar()) else {
            return;
        };
        if !action_bar.is_showing() {
            action_bar.show();
        }
    }

    // === Runtime requests ===

    /// Handle everything the runtime has asked for since the last call.
    /// Returns how many requests were handled. Call from the UI thread.
    pub fn pump_runtime_requests(&mut self) -> usize {
        let mut handled = 0;
        while let Some(request) = self.bridge.next_runtime_request() {
            self.handle_runtime_request(request);
            handled += 1;
        }
        handled
    }

    pub fn handle_runtime_request(&mut self, request: RuntimeRequest) {
        if !self.is_attached() {
            debug!(?request, "dropping runtime request without a host");
            return;
        }
        debug!(?request, "runtime request");
        match request {
            RuntimeRequest::MediaLibraryButton => {
                self.on_toolbar_media_button_clicked();
            }
            RuntimeRequest::UploadMediaButton => {
                self.listener.on_event(EditorEvent::AddPhotoClicked);
            }
            RuntimeRequest::CapturePhotoButton => {
                if let Err(err) = self.capture_photo() {
                    debug!(error = %err, "photo capture waiting on permissions");
                }
            }
            RuntimeRequest::QueryUploadProgress => self.bridge.update_media_progress(),
        }
    }

    /// Forward to the listener's capture entry point once permissions are granted.
    pub fn capture_photo(&self) -> Result<(), BridgeError> {
        let host = self.host()?;
        if host.check_and_request_camera_and_storage_permissions(
            CAPTURE_PHOTO_PERMISSION_REQUEST_CODE,
        ) {
            self.listener.on_event(EditorEvent::CapturePhotoClicked);
            Ok(())
        } else {
            Err(BridgeError::PermissionDenied)
        }
    }

    pub fn on_request_permissions_result(&self, request_code: u32) {
        if request_code != CAPTURE_PHOTO_PERMISSION_REQUEST_CODE {
            return;
        }
        if let Err(err) = self.capture_photo() {
            debug!(error = %err, "photo capture still waiting on permissions");
        }
    }

    pub fn on_toolbar_media_button_clicked(&self) -> bool {
        let Ok(host) = self.host() else {
            return false;
        };

        self.listener
            .on_event(EditorEvent::Trackable(TrackableEvent::MediaButtonTapped));

        if self.bridge.is_action_in_progress() {
            host.show_toast(Toast::ActionWhileUploading);
        }

        let listener = Arc::clone(&self.listener);
        host.run_on_ui_thread(Box::new(move || {
            listener.on_event(EditorEvent::AddMediaClicked)
        }));
        true
    }

    pub fn on_media_dropped(&self, uris: &[String]) {
        if let Some(drag_and_drop) = &self.drag_and_drop {
            drag_and_drop.on_media_dropped(uris);
        }
    }

    // === Options menu ===

    pub fn prepare_options_menu(&self) -> OptionsMenu {
        OptionsMenu {
            debug_visible: self.config.debug,
        }
    }

    pub fn on_options_item_selected(&self, item: MenuItem) -> bool {
        match item {
            MenuItem::Debug if self.is_attached() => {
                self.bridge.show_dev_options_dialog();
                true
            }
            MenuItem::Debug | MenuItem::Other(_) => false,
        }
    }

    pub fn on_undo_enabled(&self) {
        self.schedule_options_invalidation();
    }

    pub fn on_redo_enabled(&self) {
        self.schedule_options_invalidation();
    }

    /// Invalidate the options menu after the configured delay. A newer call
    /// supersedes any invalidation still pending.
    fn schedule_options_invalidation(&self) {
        let Ok(host) = self.host() else {
            return;
        };

        let generation = self.menu_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let current = Arc::clone(&self.menu_generation);
        let target = Arc::clone(host);
        host.post_delayed(
            self.config.options_invalidate_delay(),
            Box::new(move || {
                if current.load(Ordering::Acquire) == generation {
                    target.invalidate_options_menu();
                }
            }),
        );
    }

    // === Editing ===

    pub fn set_title(&self, title: Option<&str>) {
        if self.is_attached() {
            self.bridge.set_title(title);
        }
    }

    pub fn set_content(&self, content: Option<&str>) {
        if self.is_attached() {
            self.bridge.set_content(content);
        }
    }

    /// Title from the editor, or "" when detached or the fetch timed out.
    pub fn title(&self) -> String {
        if !self.is_attached() {
            return String::new();
        }
        self.bridge.get_title().unwrap_or_default()
    }

    /// Content from the editor. "" when detached; `original` if the fetch timed out.
    pub fn content(&self, original: Option<&str>) -> String {
        if !self.is_attached() {
            return String::new();
        }
        match self.bridge.get_content(original).value() {
            Some(content) => content,
            None => original.unwrap_or_default().to_string(),
        }
    }

    pub fn title_or_content_changed(&self) -> watch::Receiver<Option<String>> {
        self.bridge.title_or_content_changed()
    }

    pub fn on_toggle_html_mode(&mut self) {
        let Some(host) = self.host.clone() else {
            return;
        };
        if self.bridge.toggle_html_mode() == ToggleOutcome::BlockedWhileUploading {
            host.show_toast(Toast::ActionWhileUploading);
        }
    }

    pub fn append_media_file(&self, media_file: &MediaFile, media_url: &str) {
        if !self.is_attached() {
            // May be called from a background thread after the host went away.
            debug!(media_url, "append_media_file called without a host");
            return;
        }
        self.bridge.append_media_file(media_file, media_url);
    }

    pub fn uploads(&self) -> &Arc<UploadRegistry> {
        self.bridge.uploads()
    }

    pub fn upload_sink(&self) -> UploadSink {
        self.bridge.upload_sink()
    }

    pub fn is_uploading_media(&self) -> bool {
        self.is_attached() && self.bridge.is_uploading_media()
    }

    pub fn is_action_in_progress(&self) -> bool {
        self.is_attached() && self.bridge.is_action_in_progress()
    }

    pub fn has_failed_media_uploads(&self) -> bool {
        self.is_attached() && self.bridge.has_failed_media_uploads()
    }
}

impl MediaUploadListener for EditorHostController {
    fn on_media_upload_progress(&self, local_id: MediaId, progress: f32) {
        self.bridge.on_media_upload_progress(local_id, progress);
    }

    fn on_media_upload_succeeded(&self, local_id: MediaId, media_file: &MediaFile) {
        self.bridge.on_media_upload_succeeded(local_id, media_file);
    }

    fn on_media_upload_failed(&self, local_id: MediaId, media_type: MediaType, message: &str) {
        self.bridge.on_media_upload_failed(local_id, media_type, message);
    }

    fn on_media_upload_reattached(&self, local_id: MediaId, current_progress: f32) {
        self.bridge.on_media_upload_reattached(local_id, current_progress);
    }

    fn on_media_upload_retry(&self, local_id: MediaId, media_type: MediaType) {
        self.bridge.on_media_upload_retry(local_id, media_type);
    }
}
