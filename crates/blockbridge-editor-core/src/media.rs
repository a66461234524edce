//! Media identity types shared by the rewriter, the upload registry and the bridge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Client-assigned identifier of a media item, stable from the moment the
/// editor first sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(pub u64);

/// Server-assigned identifier, known only after a successful upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteMediaId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid media id {0:?}: expected a decimal integer")]
pub struct InvalidMediaId(pub String);

macro_rules! decimal_id {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $ty {
            type Err = InvalidMediaId;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse()
                    .map($ty)
                    .map_err(|_| InvalidMediaId(s.to_string()))
            }
        }

        impl From<u64> for $ty {
            fn from(id: u64) -> Self {
                $ty(id)
            }
        }
    };
}

decimal_id!(MediaId);
decimal_id!(RemoteMediaId);

/// MIME category of a media item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    Other,
}

impl MediaType {
    pub fn from_mime(mime: &str) -> Self {
        let category = mime.split('/').next().unwrap_or_default();
        if category.eq_ignore_ascii_case("image") {
            MediaType::Image
        } else if category.eq_ignore_ascii_case("video") {
            MediaType::Video
        } else {
            MediaType::Other
        }
    }
}

/// A media item as observed by the editor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub id: MediaId,
    /// Remote id, set once the upload succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<RemoteMediaId>,
    #[serde(default)]
    pub mime_type: SmolStr,
    /// Final remote URL once uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default)]
    pub video: bool,
}

impl MediaFile {
    pub fn new(id: impl Into<MediaId>, mime_type: impl Into<SmolStr>) -> Self {
        let mime_type = mime_type.into();
        let video = MediaType::from_mime(&mime_type) == MediaType::Video;
        Self {
            id: id.into(),
            media_id: None,
            mime_type,
            file_url: None,
            video,
        }
    }

    /// Mark the file as uploaded.
    pub fn uploaded(mut self, remote_id: impl Into<RemoteMediaId>, url: impl Into<String>) -> Self {
        self.media_id = Some(remote_id.into());
        self.file_url = Some(url.into());
        self
    }

    pub fn is_video(&self) -> bool {
        self.video
    }

    pub fn media_type(&self) -> MediaType {
        if self.video {
            MediaType::Video
        } else {
            MediaType::from_mime(&self.mime_type)
        }
    }
}
