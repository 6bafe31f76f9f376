use serde::{Deserialize, Serialize};

/// A catalog entry as held in the local store.
///
/// `is_favorite` is local-only state: the remote feed never carries it,
/// and the merge engine re-applies it when a refresh replaces the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub text: String,
    pub image_url: String,
    pub confidence: f32,
    pub is_favorite: bool,
}

impl Photo {
    pub fn new(id: impl Into<String>, text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            image_url: image_url.into(),
            confidence: 0.0,
            is_favorite: false,
        }
    }

    pub fn display_text(&self) -> &str {
        if self.text.is_empty() {
            "(untitled)"
        } else {
            &self.text
        }
    }
}

/// Pagination cursor bookkeeping, one row per cached photo.
///
/// All keys written by the same fetch batch share the same `next_key`
/// (the id of the last item in that batch, or None for an empty batch).
/// The feed is forward-only, so `prev_key` is always None.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteKey {
    pub photo_id: String,
    pub prev_key: Option<String>,
    pub next_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_text_with_text() {
        let photo = Photo::new("p1", "A lighthouse", "https://img.example.com/p1");
        assert_eq!(photo.display_text(), "A lighthouse");
    }

    #[test]
    fn test_display_text_empty() {
        let photo = Photo::new("p1", "", "https://img.example.com/p1");
        assert_eq!(photo.display_text(), "(untitled)");
    }

    #[test]
    fn test_new_defaults() {
        let photo = Photo::new("p1", "text", "url");
        assert_eq!(photo.confidence, 0.0);
        assert!(!photo.is_favorite);
    }
}
