//! Scripted runtime and host used by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use blockbridge_editor_bridge::{
    ActionBar, DragAndDropListener, EditorEvent, EditorHost, EditorHostController, EditorListener,
    EmbeddedRuntime, FetchSlot, Fetched, HostConfiguration, MediaId, RemoteMediaId,
    RuntimeRequest, RuntimeRequestSender, SessionArgs, Toast, UiTask, ViewOptions, ViewRoot,
    blockbridge_editor_core::content, fetch_channel,
};
use blockbridge_common::EditorConfig;
use parking_lot::Mutex;

/// Everything the bridge asked the runtime to do, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Create,
    CreateView(ViewOptions),
    Resume,
    Pause,
    Destroy,
    SetTitle(String),
    SetContent(String),
    GetTitle,
    GetContent(String),
    ToggleEditorMode,
    AppendMediaFile(String),
    AppendUploadMediaFile(MediaId, String),
    Progress(MediaId, f32),
    Succeeded(MediaId, String, RemoteMediaId),
    Failed(MediaId),
    DevOptions,
}

/// In-memory stand-in for the embedded editor.
///
/// Keeps a title/content buffer like the real editor would, and answers
/// fetches from a separate "dispatcher" thread unless told to stall.
pub struct RecordingRuntime {
    calls: Mutex<Vec<Call>>,
    root_view: AtomicBool,
    attach_on_create_view: AtomicBool,
    stall_fetches: AtomicBool,
    stalled: Mutex<Vec<FetchSlot<String>>>,
    title: Arc<Mutex<String>>,
    content: Arc<Mutex<Option<String>>>,
    requests: Mutex<Option<RuntimeRequestSender>>,
}

impl Default for RecordingRuntime {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            root_view: AtomicBool::new(false),
            attach_on_create_view: AtomicBool::new(true),
            stall_fetches: AtomicBool::new(false),
            stalled: Mutex::new(Vec::new()),
            title: Arc::new(Mutex::new(String::new())),
            content: Arc::new(Mutex::new(None)),
            requests: Mutex::new(None),
        }
    }
}

impl RecordingRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A runtime whose root view never attaches.
    pub fn never_ready() -> Arc<Self> {
        let runtime = Self::default();
        runtime.attach_on_create_view.store(false, Ordering::SeqCst);
        Arc::new(runtime)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Calls other than lifecycle callbacks.
    pub fn forwarded(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| {
                !matches!(
                    call,
                    Call::Create | Call::CreateView(_) | Call::Resume | Call::Pause | Call::Destroy
                )
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn set_root_view(&self, attached: bool) {
        self.root_view.store(attached, Ordering::SeqCst);
    }

    pub fn stall_fetches(&self, stall: bool) {
        self.stall_fetches.store(stall, Ordering::SeqCst);
    }

    /// Simulate the runtime dispatcher sending a request to the native side.
    pub fn send_request(&self, request: RuntimeRequest) -> bool {
        self.requests
            .lock()
            .as_ref()
            .is_some_and(|requests| requests.send(request))
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn fetch(&self, answer: impl FnOnce() -> String + Send + 'static, timeout: Duration) -> Fetched<String> {
        let (slot, wait) = fetch_channel();
        if self.stall_fetches.load(Ordering::SeqCst) {
            self.stalled.lock().push(slot);
        } else {
            std::thread::spawn(move || slot.fulfill(answer()));
        }
        wait.wait(timeout)
    }
}

impl EmbeddedRuntime for RecordingRuntime {
    fn on_create(&self) {
        self.record(Call::Create);
    }

    fn on_create_view(&self, options: ViewOptions, requests: RuntimeRequestSender) {
        self.record(Call::CreateView(options));
        *self.requests.lock() = Some(requests);
        if self.attach_on_create_view.load(Ordering::SeqCst) {
            self.set_root_view(true);
        }
    }

    fn on_resume(&self) {
        self.record(Call::Resume);
    }

    fn on_pause(&self) {
        self.record(Call::Pause);
    }

    fn on_destroy(&self) {
        self.record(Call::Destroy);
        self.set_root_view(false);
    }

    fn has_root_view(&self) -> bool {
        self.root_view.load(Ordering::SeqCst)
    }

    fn set_title(&self, title: &str) {
        self.record(Call::SetTitle(title.to_string()));
        *self.title.lock() = title.to_string();
    }

    fn set_content(&self, content: &str) {
        self.record(Call::SetContent(content.to_string()));
        *self.content.lock() = Some(content.to_string());
    }

    fn get_title(&self, timeout: Duration) -> Fetched<String> {
        self.record(Call::GetTitle);
        let title = Arc::clone(&self.title);
        self.fetch(move || title.lock().clone(), timeout)
    }

    fn get_content(&self, original: &str, timeout: Duration) -> Fetched<String> {
        self.record(Call::GetContent(original.to_string()));
        let content = Arc::clone(&self.content);
        let original = original.to_string();
        self.fetch(move || content.lock().clone().unwrap_or(original), timeout)
    }

    fn toggle_editor_mode(&self) {
        self.record(Call::ToggleEditorMode);
    }

    fn append_media_file(&self, url: &str) {
        self.record(Call::AppendMediaFile(url.to_string()));
    }

    fn append_upload_media_file(&self, local_id: MediaId, file_url: &str) {
        self.record(Call::AppendUploadMediaFile(local_id, file_url.to_string()));
        let block = format!(
            r#"{}<figure class="wp-block-image"><img src="{file_url}" class="wp-image-{local_id}"/></figure><!-- /wp:image -->"#,
            content::image_block_header(local_id)
        );
        self.content
            .lock()
            .get_or_insert_with(String::new)
            .push_str(&block);
    }

    fn media_file_upload_progress(&self, local_id: MediaId, progress: f32) {
        self.record(Call::Progress(local_id, progress));
    }

    fn media_file_upload_succeeded(
        &self,
        local_id: MediaId,
        remote_url: &str,
        remote_id: RemoteMediaId,
    ) {
        self.record(Call::Succeeded(local_id, remote_url.to_string(), remote_id));
    }

    fn media_file_upload_failed(&self, local_id: MediaId) {
        self.record(Call::Failed(local_id));
    }

    fn show_dev_options_dialog(&self) {
        self.record(Call::DevOptions);
    }
}

#[derive(Default)]
pub struct RecordingActionBar {
    showing: AtomicBool,
    pub hides: AtomicUsize,
    pub shows: AtomicUsize,
}

impl RecordingActionBar {
    pub fn showing(showing: bool) -> Arc<Self> {
        let bar = Self::default();
        bar.showing.store(showing, Ordering::SeqCst);
        Arc::new(bar)
    }

    pub fn is_visible(&self) -> bool {
        self.showing.load(Ordering::SeqCst)
    }
}

impl ActionBar for RecordingActionBar {
    fn is_showing(&self) -> bool {
        self.is_visible()
    }

    fn show(&self) {
        self.shows.fetch_add(1, Ordering::SeqCst);
        self.showing.store(true, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.hides.fetch_add(1, Ordering::SeqCst);
        self.showing.store(false, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingDrop {
    pub dropped: Mutex<Vec<String>>,
}

impl DragAndDropListener for RecordingDrop {
    fn on_media_dropped(&self, uris: &[String]) {
        self.dropped.lock().extend_from_slice(uris);
    }
}

/// Host screen that runs UI-thread work inline and queues delayed work
/// until [`RecordingHost::run_delayed`].
pub struct RecordingHost {
    pub configuration: Mutex<HostConfiguration>,
    pub action_bar: Arc<RecordingActionBar>,
    pub toasts: Mutex<Vec<Toast>>,
    pub keyboard_shown: AtomicUsize,
    pub permissions_granted: AtomicBool,
    pub permission_requests: Mutex<Vec<u32>>,
    pub ui_tasks_run: AtomicUsize,
    pub delayed: Mutex<Vec<(Duration, UiTask)>>,
    pub menu_invalidations: AtomicUsize,
    pub initialized: AtomicUsize,
    pub drag_and_drop: Option<Arc<RecordingDrop>>,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self {
            configuration: Mutex::new(HostConfiguration::default()),
            action_bar: RecordingActionBar::showing(true),
            toasts: Mutex::new(Vec::new()),
            keyboard_shown: AtomicUsize::new(0),
            permissions_granted: AtomicBool::new(true),
            permission_requests: Mutex::new(Vec::new()),
            ui_tasks_run: AtomicUsize::new(0),
            delayed: Mutex::new(Vec::new()),
            menu_invalidations: AtomicUsize::new(0),
            initialized: AtomicUsize::new(0),
            drag_and_drop: Some(Arc::new(RecordingDrop::default())),
        }
    }
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_configuration(&self, configuration: HostConfiguration) {
        *self.configuration.lock() = configuration;
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().clone()
    }

    /// Run every delayed task as if its delay elapsed. Returns how many ran.
    pub fn run_delayed(&self) -> usize {
        let tasks: Vec<_> = self.delayed.lock().drain(..).collect();
        let count = tasks.len();
        for (_, task) in tasks {
            task();
        }
        count
    }
}

impl EditorHost for RecordingHost {
    fn configuration(&self) -> HostConfiguration {
        *self.configuration.lock()
    }

    fn action_bar(&self) -> Option<Arc<dyn ActionBar>> {
        Some(self.action_bar.clone())
    }

    fn show_toast(&self, toast: Toast) {
        self.toasts.lock().push(toast);
    }

    fn show_implicit_keyboard(&self) {
        self.keyboard_shown.fetch_add(1, Ordering::SeqCst);
    }

    fn check_and_request_camera_and_storage_permissions(&self, request_code: u32) -> bool {
        if self.permissions_granted.load(Ordering::SeqCst) {
            true
        } else {
            self.permission_requests.lock().push(request_code);
            false
        }
    }

    fn run_on_ui_thread(&self, task: UiTask) {
        self.ui_tasks_run.fetch_add(1, Ordering::SeqCst);
        task();
    }

    fn post_delayed(&self, delay: Duration, task: UiTask) {
        self.delayed.lock().push((delay, task));
    }

    fn invalidate_options_menu(&self) {
        self.menu_invalidations.fetch_add(1, Ordering::SeqCst);
    }

    fn drag_and_drop_listener(&self) -> Option<Arc<dyn DragAndDropListener>> {
        self.drag_and_drop
            .clone()
            .map(|listener| listener as Arc<dyn DragAndDropListener>)
    }

    fn initialize_editor(&self) {
        self.initialized.fetch_add(1, Ordering::SeqCst);
    }
}

/// Listener that records every event.
pub fn event_log() -> (Arc<dyn EditorListener>, Arc<Mutex<Vec<EditorEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let listener: Arc<dyn EditorListener> =
        Arc::new(move |event: EditorEvent| sink.lock().push(event));
    (listener, events)
}

pub fn test_config() -> EditorConfig {
    EditorConfig {
        debug: true,
        fetch_timeout_ms: 2_000,
        ..EditorConfig::default()
    }
}

pub struct Session {
    pub controller: EditorHostController,
    pub runtime: Arc<RecordingRuntime>,
    pub host: Arc<RecordingHost>,
    pub events: Arc<Mutex<Vec<EditorEvent>>>,
}

impl Session {
    pub fn events(&self) -> Vec<EditorEvent> {
        self.events.lock().clone()
    }
}

/// A controller attached to a fresh host with its view created and resumed.
/// Runtime calls and events from startup are cleared.
pub fn started_session(args: SessionArgs) -> Session {
    let runtime = RecordingRuntime::new();
    let host = RecordingHost::new();
    let (listener, events) = event_log();

    let mut controller =
        EditorHostController::new(args, test_config(), runtime.clone(), listener);
    controller.attach(host.clone()).unwrap();
    controller.on_create(None).unwrap();
    controller.on_create_view(ViewRoot(1)).unwrap();
    controller.on_resume().unwrap();

    runtime.clear();
    events.lock().clear();

    Session {
        controller,
        runtime,
        host,
        events,
    }
}
