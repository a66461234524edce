//! blockbridge-editor-core: editor-side logic with no runtime or UI dependencies.
//!
//! This crate provides:
//! - `content` - targeted rewrites on block-editor post content
//! - `media` - media identity (`MediaId`, `RemoteMediaId`, `MediaFile`)
//! - `UploadRegistry` - thread-safe upload progress and failure tracking

pub mod content;
pub mod media;
pub mod upload;

pub use content::{
    BLOCK_START, contains_blocks, contains_blocks_opt, is_media_in_body, replace_media,
    strip_legacy_progress,
};
pub use media::{InvalidMediaId, MediaFile, MediaId, MediaType, RemoteMediaId};
pub use smol_str::SmolStr;
pub use upload::{UploadRegistry, UploadState, clamp_progress};
