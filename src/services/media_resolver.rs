//! Decide whether a media URL renders as video or image.
//!
//! URL classification is a heuristic: any URL containing `video` is treated
//! as a video, even an image such as `https://x/video/a.png`. Prefer a stored
//! kind (see [`resolve`]) when one is available.

use crate::models::media::MediaKind;

const VIDEO_EXTENSIONS: [&str; 3] = [".mp4", ".webm", ".ogg"];

/// Classify a media URL by its suffix or the literal substring `video`.
pub fn classify(url: Option<&str>) -> MediaKind {
    let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
        return MediaKind::None;
    };

    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    let has_video_extension = VIDEO_EXTENSIONS.iter().any(|ext| path.ends_with(ext));

    if has_video_extension || url.contains("video") {
        MediaKind::Video
    } else {
        MediaKind::Image
    }
}

/// Kind implied by a MIME type recorded at upload time.
pub fn from_content_type(content_type: &str) -> MediaKind {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if essence.starts_with("video/") {
        MediaKind::Video
    } else if essence.starts_with("image/") {
        MediaKind::Image
    } else {
        MediaKind::None
    }
}

/// Use the stored kind when present, otherwise classify the URL.
pub fn resolve(stored: Option<MediaKind>, url: Option<&str>) -> MediaKind {
    match stored {
        Some(kind) if kind != MediaKind::None => kind,
        _ => classify(url),
    }
}
