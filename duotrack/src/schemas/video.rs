use duotrack_core::Ratings;
use serde::{Deserialize, Serialize};

use crate::schemas::common::{Collection, Comment, Item, Notes};

/// A saved online video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub watched: bool,
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default)]
    pub notes: Notes,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Video {
    pub fn new(title: &str, url: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            url: url.trim().to_string(),
            channel: None,
            watched: false,
            ratings: Ratings::default(),
            notes: Notes::default(),
            comments: Vec::new(),
        }
    }
}

impl Item for Video {
    const COLLECTION: Collection = Collection::Videos;

    fn title(&self) -> &str {
        &self.title
    }

    fn ratings(&self) -> &Ratings {
        &self.ratings
    }

    fn ratings_mut(&mut self) -> &mut Ratings {
        &mut self.ratings
    }

    fn notes(&self) -> &Notes {
        &self.notes
    }

    fn notes_mut(&mut self) -> &mut Notes {
        &mut self.notes
    }

    fn comments(&self) -> &[Comment] {
        &self.comments
    }

    fn comments_mut(&mut self) -> &mut Vec<Comment> {
        &mut self.comments
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Video;

    #[test]
    fn test_sparse_document() {
        let video: Video = serde_json::from_value(json!({
            "title": "How trains work",
            "url": "https://example.com/v/1",
            "lastEditedBy": "T"
        }))
        .unwrap();
        assert!(!video.watched);
        assert_eq!(video.ratings.average(), None);
        assert_eq!(video.notes.t, "");

        let out = serde_json::to_value(&video).unwrap();
        assert_eq!(out["ratings"], json!({ "Z": null, "T": null }));
        assert_eq!(out["channel"], json!(null));
    }
}
