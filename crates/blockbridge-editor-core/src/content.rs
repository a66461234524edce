//! Targeted rewrites on block-editor post content.
//!
//! None of this parses the block grammar. Every function matches the exact
//! literal forms the block editor writes for an image block:
//!
//! ```text
//! <!-- wp:image {"id":42} -->
//! <figure class="wp-block-image"><img src="file:///a.jpg" class="wp-image-42"/></figure>
//! <!-- /wp:image -->
//! ```
//!
//! Extra attributes or alternate spacing in the header are not recognized.

use std::borrow::Cow;
use std::fmt::Display;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::media::{MediaFile, MediaId};

/// Marker that signals block markup.
pub const BLOCK_START: &str = "<!-- wp:";

/// `<img ...` tag up to its first `src` value, which is captured.
static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^<img[^>]*?\ssrc=["']([^"']*)"#).expect("img src pattern is valid")
});

/// Progress bars and the opening image-container spans a previous visual
/// editor left behind. Closing `</span>` tags are left alone.
static LEGACY_PROGRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"<progress.*?></progress>"#,
        r#"|<span id="img_container.*? class="img_container" contenteditable="false">"#,
    ))
    .expect("legacy progress pattern is valid")
});

/// Whether the content uses block markup.
///
/// Optimized for speed over accuracy: it detects the start of a block
/// marker but doesn't validate anything after it.
pub fn contains_blocks(content: &str) -> bool {
    content.contains(BLOCK_START)
}

/// [`contains_blocks`] for content that may be missing entirely.
pub fn contains_blocks_opt(content: Option<&str>) -> bool {
    content.is_some_and(contains_blocks)
}

/// Opening marker of the image block for media `id`.
pub fn image_block_header(id: impl Display) -> String {
    format!("<!-- wp:image {{\"id\":{id}}} -->")
}

/// `class` attribute the editor puts on the `<img>` of media `id`.
pub fn image_class_attribute(id: impl Display) -> String {
    format!("class=\"wp-image-{id}\"")
}

/// Whether the image block for `local_id` is present in the post.
pub fn is_media_in_body(content: &str, local_id: MediaId) -> bool {
    content.contains(&image_block_header(local_id))
}

/// Swap the placeholder identity of an uploaded image for its remote one.
///
/// Rewrites every image header and `wp-image-` class for `local_id` to the
/// remote id, then points the `src` of the `<img>` that carries the first
/// rewritten class at the remote URL. Only that one `src` changes.
///
/// Returns the content unchanged when `media_file` is `None`, is a video, or
/// has no remote id yet.
pub fn replace_media(content: &str, local_id: MediaId, media_file: Option<&MediaFile>) -> String {
    let Some(media_file) = media_file else {
        return content.to_string();
    };

    // TODO: rewrite the video block once video uploads go through this path
    if media_file.is_video() {
        return content.to_string();
    }

    let Some(remote_id) = media_file.media_id else {
        tracing::debug!(local_id = %local_id, "media file has no remote id, nothing to rewrite");
        return content.to_string();
    };

    let remote_url = escape_quotes(media_file.file_url.as_deref().unwrap_or_default());

    let mut content = content.replace(
        &image_block_header(local_id),
        &image_block_header(remote_id),
    );

    let new_class = image_class_attribute(remote_id);
    content = content.replace(&image_class_attribute(local_id), &new_class);

    if let Some(src) = img_src_before(&content, &new_class) {
        content.replace_range(src, &remote_url);
    }

    content
}

/// Byte range of the `src` value of the nearest `<img` preceding the first
/// occurrence of `class_attr`.
fn img_src_before(content: &str, class_attr: &str) -> Option<Range<usize>> {
    let class_at = content.find(class_attr)?;
    let img_at = content[..class_at].rfind("<img")?;
    let value = IMG_SRC.captures(&content[img_at..])?.get(1)?;
    Some(img_at + value.start()..img_at + value.end())
}

fn escape_quotes(text: &str) -> String {
    text.replace('\'', "\\'").replace('"', "\\\"")
}

/// Remove markup the legacy visual editor used for in-progress uploads.
///
/// Idempotent.
pub fn strip_legacy_progress(content: &str) -> Cow<'_, str> {
    let mut stripped = Cow::Borrowed(content);
    if !content.contains("<progress") {
        return stripped;
    }

    // Removing one match can splice together another.
    while LEGACY_PROGRESS.is_match(&stripped) {
        stripped = Cow::Owned(LEGACY_PROGRESS.replace_all(&stripped, "").into_owned());
    }
    stripped
}
