use chrono::NaiveDate;
use duotrack_core::{
    geo::{Category, Coordinates},
    Ratings, UserId,
};
use serde::{Deserialize, Serialize};

use crate::schemas::common::{Collection, Comment, Item, Notes};

/// One trip to a place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub date: NaiveDate,
    pub by: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default)]
    pub notes: Notes,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub visits: Vec<Visit>,
}

impl Place {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            address: None,
            coordinates: None,
            category: None,
            ratings: Ratings::default(),
            notes: Notes::default(),
            comments: Vec::new(),
            visits: Vec::new(),
        }
    }

    pub fn visited(&self) -> bool {
        !self.visits.is_empty()
    }

    pub fn last_visit(&self) -> Option<&Visit> {
        self.visits.iter().max_by_key(|v| v.date)
    }

    /// The visits newest first, the way the history is listed.
    pub fn history(&self) -> Vec<&Visit> {
        let mut visits: Vec<&Visit> = self.visits.iter().collect();
        visits.sort_by(|a, b| b.date.cmp(&a.date));
        visits
    }
}

impl Item for Place {
    const COLLECTION: Collection = Collection::Places;

    fn title(&self) -> &str {
        &self.name
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
