//! Notifications from the editor to the host screen.

/// Analytics events the editor asks the host to record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackableEvent {
    HtmlButtonTapped,
    MediaButtonTapped,
}

/// Everything the host listener can be told.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorEvent {
    /// The editor view is laid out and ready.
    Initialized,
    /// Pick media from the device.
    AddPhotoClicked,
    /// Camera permissions are granted, take a photo.
    CapturePhotoClicked,
    /// Open the media library.
    AddMediaClicked,
    HtmlModeToggledInToolbar,
    Trackable(TrackableEvent),
}

/// Single dispatch point for [`EditorEvent`]s.
///
/// Implemented for any `Fn(EditorEvent)` closure.
pub trait EditorListener: Send + Sync {
    fn on_event(&self, event: EditorEvent);
}

impl<F> EditorListener for F
where
    F: Fn(EditorEvent) + Send + Sync,
{
    fn on_event(&self, event: EditorEvent) {
        self(event)
    }
}

/// Transient messages shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toast {
    /// The requested action can't run while media is uploading or another
    /// action is in progress.
    ActionWhileUploading,
}

impl Toast {
    pub fn message(self) -> &'static str {
        match self {
            Toast::ActionWhileUploading => {
                "This action is not available while media is uploading"
            }
        }
    }
}
