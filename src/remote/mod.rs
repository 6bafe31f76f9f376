pub mod http;

use async_trait::async_trait;
use serde::Deserialize;

use crate::app::Result;
use crate::domain::Photo;

pub use http::HttpRemoteSource;

/// Cursor-paginated catalog endpoint.
///
/// `cursor` is the id of the last item already fetched (None = start of
/// the feed). An empty batch is a valid terminal response, not an error.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Vec<Photo>>;
}

/// Wire representation of a catalog entry. The server may omit text,
/// image, and confidence; `is_favorite` never comes over the wire.
#[derive(Debug, Deserialize)]
pub struct PhotoDto {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "image", default)]
    pub image: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl PhotoDto {
    pub fn into_photo(self) -> Photo {
        Photo {
            id: self.id,
            text: self.text.unwrap_or_default(),
            image_url: sanitize_image_url(self.image.as_deref()),
            confidence: self.confidence.unwrap_or(0.0),
            is_favorite: false,
        }
    }
}

const PLACEHOLDER_HOST: &str = "placehold.co";
const EXTENSION_PNG: &str = ".png";
const QUERY_PARAM_TEXT: &str = "?text=";
const REPLACEMENT_PNG_PARAM: &str = ".png?text=";

/// Work around placeholder URLs that lack an image extension, which some
/// image pipelines refuse to decode.
pub fn sanitize_image_url(url: Option<&str>) -> String {
    let url = match url {
        Some(u) if !u.trim().is_empty() => u,
        _ => return String::new(),
    };

    if url.contains(PLACEHOLDER_HOST) && !url.contains(EXTENSION_PNG) {
        url.replace(QUERY_PARAM_TEXT, REPLACEMENT_PNG_PARAM)
    } else {
        url.to_string()
    }
}
