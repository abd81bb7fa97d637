use chrono::NaiveDate;
use duotrack_core::{
    rating::{stars, FillState},
    reconcile::SyncedField,
    ActiveUser, Error, Notice, Rating, Result, StarIndex,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    schemas::{
        common::{Comment, Item},
        media::{Media, Status},
        place::{Place, Visit},
        video::Video,
    },
    store::{patch, Document, DocumentStore, FieldPatch},
};

/// The detail view of one item, acting as one user.
///
/// Holds the last snapshot of the item (`item`) and the user's note as an edit
/// buffer. Writes go straight to the store; the view only changes once a write
/// succeeded, or when a snapshot arrives. A failed write leaves the view as it
/// was and comes back as a [`Notice`].
pub struct ItemPanel<S, T> {
    store: Arc<S>,
    user: ActiveUser,
    id: String,
    item: T,
    note: SyncedField<String>,
}

impl<S: DocumentStore, T: Item> ItemPanel<S, T> {
    pub async fn open(store: Arc<S>, user: ActiveUser, id: &str) -> Result<Self> {
        let document = store
            .get(T::COLLECTION, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{}/{}", T::COLLECTION, id)))?;
        let item: T = document.decode()?;
        let note = SyncedField::new(item.notes().get(user.id()).to_string());
        info!("{} opened {}/{} ({})", user.id(), T::COLLECTION, id, item.title());
        Ok(Self {
            store,
            user,
            id: id.to_string(),
            item,
            note,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user(&self) -> ActiveUser {
        self.user
    }

    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn my_rating(&self) -> Option<Rating> {
        self.item.ratings().get(self.user.id())
    }

    /// The active user's five stars.
    pub fn fill_states(&self) -> Vec<FillState> {
        stars(self.my_rating())
    }

    pub fn average_text(&self) -> Option<String> {
        self.item.ratings().average_text()
    }

    async fn persist(&self, patch: FieldPatch) -> std::result::Result<(), Notice> {
        self.store
            .update(T::COLLECTION, &self.id, patch, self.user.id())
            .await
            .map_err(Notice::from)
    }

    /// Advance the active user's rating by a tap on `star` and save the whole ratings map.
    ///
    /// Taps are not queued: two quick taps each read the rating currently on screen.
    pub async fn tap_star(&mut self, star: StarIndex) -> std::result::Result<Option<Rating>, Notice> {
        let ratings = self.item.ratings().tapped(self.user.id(), star);
        let next = ratings.get(self.user.id());
        debug!(
            "{} tapped star {} on {}: {:?} -> {:?}",
            self.user.id(),
            star.get(),
            self.id,
            self.my_rating(),
            next
        );

        self.persist(patch("ratings", &ratings)?).await?;
        *self.item.ratings_mut() = ratings;
        Ok(next)
    }

    pub fn note(&self) -> &str {
        self.note.local()
    }

    pub fn note_is_dirty(&self) -> bool {
        self.note.is_dirty()
    }

    pub fn edit_note(&mut self, text: &str) {
        self.note.edit(text.to_string());
    }

    pub async fn save_note(&mut self) -> std::result::Result<(), Notice> {
        if !self.note.is_dirty() {
            return Ok(());
        }
        let mut notes = self.item.notes().clone();
        notes.set(self.user.id(), self.note.local().clone());

        self.persist(patch("notes", &notes)?).await?;
        *self.item.notes_mut() = notes;
        self.note.mark_saved();
        Ok(())
    }

    pub async fn add_comment(&mut self, text: &str) -> std::result::Result<(), Notice> {
        let comment = Comment::new(self.user.id(), text)?;
        let mut comments = self.item.comments().to_vec();
        comments.push(comment);

        self.persist(patch("comments", &comments)?).await?;
        *self.item.comments_mut() = comments;
        Ok(())
    }

    /// Replace the view with an incoming snapshot.
    ///
    /// The note buffer is only overwritten if the stored note changed since it was
    /// last seen; returns whether that happened.
    pub fn apply_snapshot(&mut self, document: &Document) -> Result<bool> {
        let item: T = document.decode()?;
        let overwritten = self
            .note
            .reconcile(&item.notes().get(self.user.id()).to_string());
        if overwritten {
            debug!("note on {} changed elsewhere, replacing local copy", self.id);
        }
        self.item = item;
        Ok(overwritten)
    }
}

impl<S: DocumentStore> ItemPanel<S, Media> {
    pub async fn set_status(&mut self, status: Status) -> std::result::Result<(), Notice> {
        self.persist(patch("status", &status)?).await?;
        self.item.status = status;
        Ok(())
    }
}

impl<S: DocumentStore> ItemPanel<S, Place> {
    pub async fn add_visit(
        &mut self,
        date: NaiveDate,
        note: Option<&str>,
    ) -> std::result::Result<(), Notice> {
        let mut visits = self.item.visits.clone();
        visits.push(Visit {
            date,
            by: self.user.id(),
            note: note
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from),
        });

        self.persist(patch("visits", &visits)?).await?;
        self.item.visits = visits;
        Ok(())
    }
}

impl<S: DocumentStore> ItemPanel<S, Video> {
    pub async fn set_watched(&mut self, watched: bool) -> std::result::Result<(), Notice> {
        self.persist(patch("watched", &watched)?).await?;
        self.item.watched = watched;
        Ok(())
    }
}
