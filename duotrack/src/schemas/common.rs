use chrono::{DateTime, Utc};
use duotrack_core::{Error, Ratings, Result, UserId};
use hex::ToHex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::{fmt::Display, str::FromStr};

/// The document collections the tracker keeps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr,
)]
pub enum Collection {
    Media,
    Places,
    Videos,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Media => "media",
            Self::Places => "places",
            Self::Videos => "videos",
        }
    }
}

impl FromStr for Collection {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "media" => Ok(Self::Media),
            "places" | "place" => Ok(Self::Places),
            "videos" | "video" => Ok(Self::Videos),
            _ => Err(Error::invalid(format!("unknown collection `{}`", s))),
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-text notes, one per user. Serialized like [`Ratings`]: both keys, always.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notes {
    #[serde(rename = "Z", default)]
    pub z: String,
    #[serde(rename = "T", default)]
    pub t: String,
}

impl Notes {
    pub fn get(&self, user: UserId) -> &str {
        match user {
            UserId::Z => &self.z,
            UserId::T => &self.t,
        }
    }

    pub fn set(&mut self, user: UserId, note: String) {
        match user {
            UserId::Z => self.z = note,
            UserId::T => self.t = note,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(author: UserId, text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::invalid("Comment cannot be empty."));
        }
        Ok(Self {
            author,
            text: text.to_string(),
            created_at: Utc::now(),
        })
    }
}

/// Something two users rate, annotate and discuss, stored in one [`Collection`].
pub trait Item: Serialize + DeserializeOwned + Clone + Send + Sync {
    const COLLECTION: Collection;

    fn title(&self) -> &str;

    fn ratings(&self) -> &Ratings;
    fn ratings_mut(&mut self) -> &mut Ratings;

    fn notes(&self) -> &Notes;
    fn notes_mut(&mut self) -> &mut Notes;

    fn comments(&self) -> &[Comment];
    fn comments_mut(&mut self) -> &mut Vec<Comment>;
}

/// 20 hex characters, the same shape of id the hosted store hands out.
pub fn new_id() -> String {
    rand::random::<[u8; 10]>().encode_hex::<String>()
}

#[cfg(test)]
mod tests {
    use duotrack_core::UserId;

    use super::{new_id, Collection, Comment, Notes};

    #[test]
    fn test_collection() {
        assert_eq!("Places".parse::<Collection>().unwrap(), Collection::Places);
        assert_eq!("video".parse::<Collection>().unwrap(), Collection::Videos);
        assert!("books".parse::<Collection>().is_err());
        assert_eq!(Collection::Media.to_string(), "media");
    }

    #[test]
    fn test_notes_serde() {
        let mut notes = Notes::default();
        notes.set(UserId::T, "rewatch with subtitles".into());
        assert_eq!(
            serde_json::to_value(&notes).unwrap(),
            serde_json::json!({ "Z": "", "T": "rewatch with subtitles" })
        );
        assert_eq!(notes.get(UserId::Z), "");
    }

    #[test]
    fn test_comment() {
        assert!(Comment::new(UserId::Z, "   ").is_err());
        let c = Comment::new(UserId::Z, " loved the ending ").unwrap();
        assert_eq!(c.text, "loved the ending");
        assert_eq!(c.author, UserId::Z);
    }

    #[test]
    fn test_new_id() {
        let a = new_id();
        assert_eq!(a.len(), 20);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, new_id());
    }
}
