//! Media source selection
//!
//! The payload lists candidate video files; the first one the media element
//! says it can play becomes the active source. Localized audio comes from the
//! point-of-interest table in `poi`.

pub mod poi;

pub use poi::{PoiEntry, POI_TABLE};

use crate::config::MediaCandidate;
use crate::platform::MediaElement;

/// First candidate whose MIME type the element reports as playable
pub fn select_source<'a>(
    candidates: &'a [MediaCandidate],
    media: &dyn MediaElement,
) -> Option<&'a MediaCandidate> {
    candidates.iter().find(|candidate| {
        let answer = media.can_play_type(&candidate.mime_type);
        log::trace!("{} ({}) -> {:?}", candidate.url, candidate.mime_type, answer);
        answer.is_playable()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::headless::HeadlessMedia;

    fn candidate(url: &str, mime_type: &str) -> MediaCandidate {
        MediaCandidate {
            url: url.to_string(),
            mime_type: mime_type.to_string(),
        }
    }

    #[test]
    fn test_first_playable_candidate_wins() {
        let media = HeadlessMedia::supporting(&["video/webm", "video/mp4"]);
        let candidates = vec![
            candidate("a.mp4", "video/unsupported"),
            candidate("b.webm", "video/webm"),
            candidate("c.mp4", "video/mp4"),
        ];
        assert_eq!(select_source(&candidates, &media).map(|c| c.url.as_str()), Some("b.webm"));
    }

    #[test]
    fn test_nothing_playable() {
        let media = HeadlessMedia::supporting(&["video/webm"]);
        let candidates = vec![candidate("a.mp4", "video/mp4")];
        assert_eq!(select_source(&candidates, &media), None);
        assert_eq!(select_source(&[], &media), None);
    }
}
