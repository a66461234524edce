//! Native-side bridge to the embedded block editor.
//!
//! # Architecture
//!
//! - `runtime`: the `EmbeddedRuntime` contract and fetch/request plumbing
//! - `lifecycle`: bridge lifecycle state machine
//! - `bridge`: `EditorBridge`, upload event sink
//! - `host`: `EditorHostController` and the `EditorHost` platform surface
//! - `events`: listener events, analytics, toasts
//!
//! # Re-exports
//!
//! This crate re-exports `blockbridge-editor-core` so consumers only need to
//! depend on `blockbridge-editor-bridge`.

pub use blockbridge_editor_core;
pub use blockbridge_editor_core::*;

pub mod bridge;
pub mod events;
pub mod host;
pub mod lifecycle;
pub mod runtime;

pub use bridge::{EditorBridge, MediaUploadListener, SessionState, ToggleOutcome, UploadSink};
pub use events::{EditorEvent, EditorListener, Toast, TrackableEvent};
pub use host::{
    ActionBar, CAPTURE_PHOTO_PERMISSION_REQUEST_CODE, DragAndDropListener, EditorHost,
    EditorHostController, HostConfiguration, Keyboard, MenuItem, OptionsMenu, Orientation,
    SavedState, SessionArgs, TouchAction, UiTask,
};
pub use lifecycle::{BridgeState, LifecycleCell, LifecycleEvent};
pub use runtime::{
    EmbeddedRuntime, FetchSlot, FetchWait, Fetched, RuntimeRequest, RuntimeRequestSender,
    ViewOptions, ViewRoot, fetch_channel,
};
