//! Top artists and tracks

use serde::{Deserialize, Serialize};

use super::user::Image;

/// Artist reference embedded in a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: String,
}

/// Album reference embedded in a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRef {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// One entry of a top-artists or top-tracks listing.
///
/// Artists carry `genres` and `images`; tracks carry `artists` and `album`.
/// The unused side stays empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Option<AlbumRef>,
}

impl TopItem {
    /// Artwork for the item: the artist's own image or the track's album cover.
    pub fn artwork(&self) -> Option<&Image> {
        self.images
            .first()
            .or_else(|| self.album.as_ref().and_then(|album| album.images.first()))
    }
}

/// Offset-paginated listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_artwork_comes_from_album() {
        let json = r#"{
            "items": [{
                "id": "t1",
                "name": "Song",
                "popularity": 71,
                "artists": [{"id": "a1", "name": "Band"}],
                "album": {"name": "Record", "images": [{"url": "https://img/cover"}]}
            }],
            "total": 50, "limit": 1, "offset": 0
        }"#;

        let page: Page<TopItem> = serde_json::from_str(json).unwrap();
        let track = &page.items[0];
        assert_eq!(track.artists[0].name, "Band");
        assert_eq!(track.artwork().map(|i| i.url.as_str()), Some("https://img/cover"));
        assert_eq!(page.total, 50);
    }

    #[test]
    fn artist_without_images_has_no_artwork() {
        let item: TopItem =
            serde_json::from_str(r#"{"id": "a1", "name": "Band", "genres": ["shoegaze"]}"#)
                .unwrap();
        assert!(item.artwork().is_none());
        assert_eq!(item.genres, vec!["shoegaze".to_string()]);
    }
}
