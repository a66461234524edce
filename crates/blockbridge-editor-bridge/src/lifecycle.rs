//! Lifecycle state machine of the editor bridge.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use blockbridge_common::BridgeError;

/// `Constructed → Created → ViewAttached ⇄ Paused/Resumed → Destroyed`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BridgeState {
    Constructed = 0,
    Created = 1,
    ViewAttached = 2,
    Paused = 3,
    Resumed = 4,
    Destroyed = 5,
}

/// Lifecycle inputs, as delivered by the host screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    Create,
    CreateView,
    Resume,
    Pause,
    Destroy,
}

impl BridgeState {
    pub fn name(self) -> &'static str {
        match self {
            BridgeState::Constructed => "constructed",
            BridgeState::Created => "created",
            BridgeState::ViewAttached => "view-attached",
            BridgeState::Paused => "paused",
            BridgeState::Resumed => "resumed",
            BridgeState::Destroyed => "destroyed",
        }
    }

    /// Whether the runtime root view has been created and not yet released.
    pub fn is_view_attached(self) -> bool {
        matches!(
            self,
            BridgeState::ViewAttached | BridgeState::Paused | BridgeState::Resumed
        )
    }

    /// State after `event`, or an error for transitions the machine doesn't allow.
    pub fn next(self, event: LifecycleEvent) -> Result<BridgeState, BridgeError> {
        use BridgeState::*;
        use LifecycleEvent::*;

        let next = match (self, event) {
            (Constructed, Create) => Created,
            (Created, CreateView) => ViewAttached,
            (ViewAttached | Paused, Resume) => Resumed,
            (ViewAttached | Resumed, Pause) => Paused,
            (Destroyed, Destroy) => {
                return Err(self.invalid(event));
            }
            (_, Destroy) => Destroyed,
            _ => return Err(self.invalid(event)),
        };
        Ok(next)
    }

    fn invalid(self, event: LifecycleEvent) -> BridgeError {
        BridgeError::InvalidTransition {
            from: self.name(),
            event: event.name(),
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => BridgeState::Constructed,
            1 => BridgeState::Created,
            2 => BridgeState::ViewAttached,
            3 => BridgeState::Paused,
            4 => BridgeState::Resumed,
            _ => BridgeState::Destroyed,
        }
    }
}

impl LifecycleEvent {
    pub fn name(self) -> &'static str {
        match self {
            LifecycleEvent::Create => "create",
            LifecycleEvent::CreateView => "create-view",
            LifecycleEvent::Resume => "resume",
            LifecycleEvent::Pause => "pause",
            LifecycleEvent::Destroy => "destroy",
        }
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bridge state readable from upload worker threads.
///
/// Only the UI thread transitions the state; workers only load it. Stores
/// use `Release` and loads `Acquire`, so a worker that sees `ViewAttached`
/// also sees everything the UI thread did before attaching the view.
#[derive(Debug)]
pub struct LifecycleCell(AtomicU8);

impl Default for LifecycleCell {
    fn default() -> Self {
        Self(AtomicU8::new(BridgeState::Constructed as u8))
    }
}

impl LifecycleCell {
    pub fn get(&self) -> BridgeState {
        BridgeState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Apply `event`, leaving the state untouched on error.
    pub fn advance(&self, event: LifecycleEvent) -> Result<BridgeState, BridgeError> {
        let next = self.get().next(event)?;
        self.0.store(next as u8, Ordering::Release);
        Ok(next)
    }
}
