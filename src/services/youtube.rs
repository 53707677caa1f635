//! YouTube link parsing for the video showcase.

use serde::Serialize;

/// Path markers and the characters that end the id, tried in order. Markers
/// are matched anywhere in the URL, so the scheme and `www.` are optional.
const LINK_SHAPES: [(&str, &str); 4] = [
    ("youtube.com/watch?v=", "&?#"),
    ("youtu.be/", "?#"),
    ("youtube.com/shorts/", "?#"),
    ("youtube.com/embed/", "?#"),
];

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct YoutubeVideo {
    pub video_id: String,
    pub thumbnail_url: String,
}

/// Extract the video id from a watch, short-link, shorts or embed URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    LINK_SHAPES.iter().find_map(|(marker, stops)| {
        let start = url.find(marker)? + marker.len();
        let id: String = url[start..]
            .chars()
            .take_while(|c| !c.is_whitespace() && !stops.contains(*c))
            .collect();
        (!id.is_empty()).then_some(id)
    })
}

pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/maxresdefault.jpg", video_id)
}

/// Id and thumbnail for a YouTube link, `None` when the URL is not one.
pub fn resolve(url: &str) -> Option<YoutubeVideo> {
    extract_video_id(url).map(|video_id| YoutubeVideo {
        thumbnail_url: thumbnail_url(&video_id),
        video_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ids_from_supported_shapes() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", "dQw4w9WgXcQ"),
            ("youtube.com/watch?v=dQw4w9WgXcQ&t=42s", "dQw4w9WgXcQ"),
            ("http://youtu.be/abc123?si=share", "abc123"),
            ("https://www.youtube.com/shorts/shortID#frag", "shortID"),
            ("https://youtube.com/embed/embedID?autoplay=1", "embedID"),
        ];
        for (url, id) in cases {
            assert_eq!(extract_video_id(url).as_deref(), Some(id), "{url}");
        }
    }

    #[test]
    fn rejects_other_urls() {
        for url in [
            "https://vimeo.com/123",
            "https://www.youtube.com/@Ak_With_AI",
            "https://www.youtube.com/watch?v=",
            "",
        ] {
            assert_eq!(extract_video_id(url), None, "{url}");
        }
    }

    #[test]
    fn builds_max_resolution_thumbnail() {
        let video = resolve("https://youtu.be/abc123").unwrap();
        assert_eq!(video.video_id, "abc123");
        assert_eq!(
            video.thumbnail_url,
            "https://img.youtube.com/vi/abc123/maxresdefault.jpg"
        );
    }
}
