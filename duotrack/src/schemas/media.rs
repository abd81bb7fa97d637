use duotrack_core::{Error, Ratings, Result};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::{fmt::Display, str::FromStr};

use crate::schemas::common::{Collection, Comment, Item, Notes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum MediaKind {
    Movie,
    Show,
    Game,
}

impl FromStr for MediaKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" | "film" => Ok(Self::Movie),
            "show" | "tv" | "series" => Ok(Self::Show),
            "game" => Ok(Self::Game),
            _ => Err(Error::invalid(format!("unknown media kind `{}`", s))),
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Movie => "movie",
            Self::Show => "show",
            Self::Game => "game",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum Status {
    Planned,
    InProgress,
    Completed,
    Dropped,
}

impl Default for Status {
    fn default() -> Self {
        Self::Planned
    }
}

impl FromStr for Status {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "planned" => Ok(Self::Planned),
            "in_progress" | "watching" | "playing" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            "dropped" => Ok(Self::Dropped),
            _ => Err(Error::invalid(format!("unknown status `{}`", s))),
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Planned => "planned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Dropped => "dropped",
        })
    }
}

/// A movie, show or game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub title: String,
    pub kind: MediaKind,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default)]
    pub notes: Notes,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Media {
    pub fn new(title: &str, kind: MediaKind) -> Self {
        Self {
            title: title.trim().to_string(),
            kind,
            year: None,
            status: Status::default(),
            ratings: Ratings::default(),
            notes: Notes::default(),
            comments: Vec::new(),
        }
    }
}

impl Item for Media {
    const COLLECTION: Collection = Collection::Media;

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
    use super::{Media, MediaKind, Status};

    #[test]
    fn test_parse_enums() {
        assert_eq!("TV".parse::<MediaKind>().unwrap(), MediaKind::Show);
        assert_eq!("in-progress".parse::<Status>().unwrap(), Status::InProgress);
        assert!("abandoned".parse::<Status>().is_err());
    }

    #[test]
    fn test_sparse_document() {
        /* documents written by older clients only carry title and kind */
        let media: Media =
            serde_json::from_str(r#"{ "title": "Arrival", "kind": "movie" }"#).unwrap();
        assert_eq!(media.status, Status::Planned);
        assert_eq!(media.ratings.average(), None);
        assert!(media.comments.is_empty());

        let value = serde_json::to_value(&media).unwrap();
        assert_eq!(value["status"], "planned");
        assert_eq!(value["ratings"], serde_json::json!({ "Z": null, "T": null }));
    }
}
