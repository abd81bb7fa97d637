//! # Document store
//!
//! The tracker's data lives in a hosted real-time document store. This module
//! only fixes the shape of the conversation with it:
//!
//! - documents are JSON objects grouped in a [`Collection`], keyed by id
//! - writes are partial: the top-level fields of a patch replace the stored ones
//! - every write is tagged with the acting user (`lastEditedBy`) and a timestamp
//! - every write is broadcast to subscribers as a full snapshot
//!
//! There is no conflict resolution. Two users writing the same field race and
//! the last write wins; rating taps and comment appends can lose an update when
//! both phones write within the same round trip.
//!
//! [`MemoryStore`] keeps everything in memory, [`FileStore`] keeps it in one
//! JSON file that several handles may share.
use async_trait::async_trait;
use chrono::Utc;
use duotrack_core::{Error, Result, UserId};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::schemas::common::{new_id, Collection};

pub const LAST_EDITED_BY: &str = "lastEditedBy";
pub const UPDATED_AT: &str = "updatedAt";

pub type FieldPatch = Map<String, Value>;

/// A single-field patch, e.g. `{"ratings": {"Z": 2.5, "T": null}}`.
pub fn patch<T: Serialize>(field: &str, value: &T) -> Result<FieldPatch> {
    let mut patch = FieldPatch::new();
    patch.insert(field.to_string(), serde_json::to_value(value)?);
    Ok(patch)
}

/// Every top-level field of `item`, for [`DocumentStore::create`].
pub fn fields_of<T: Serialize>(item: &T) -> Result<FieldPatch> {
    match serde_json::to_value(item)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::invalid(format!("expected an object, got {}", other))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }

    pub fn last_edited_by(&self) -> Option<UserId> {
        self.fields
            .get(LAST_EDITED_BY)
            .and_then(Value::as_str)
            .and_then(|s| UserId::from_str(s).ok())
    }
}

/// A write, as seen by subscribers. `document` is `None` after a delete.
#[derive(Debug, Clone)]
pub struct Change {
    pub collection: Collection,
    pub id: String,
    pub document: Option<Document>,
}

/// Snapshots of one document.
pub struct Subscription {
    collection: Collection,
    id: String,
    changes: broadcast::Receiver<Change>,
}

impl Subscription {
    /// The next change to the subscribed document, `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Change> {
        loop {
            match self.changes.recv().await {
                Ok(change) if change.collection == self.collection && change.id == self.id => {
                    return Some(change)
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(
                        "subscription to {}/{} skipped {} changes",
                        self.collection, self.id, skipped
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>>;

    /// Store a new document under a fresh id and return the id.
    async fn create(&self, collection: Collection, fields: FieldPatch, actor: UserId)
        -> Result<String>;

    /// Merge the top-level fields of `patch` into an existing document.
    ///
    /// # Errors
    /// [`Error::NotFound`] if there is no such document.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: FieldPatch,
        actor: UserId,
    ) -> Result<()>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<()>;

    /// Every document in `collection`, ordered by id.
    async fn list(&self, collection: Collection) -> Result<Vec<Document>>;

    fn subscribe(&self, collection: Collection, id: &str) -> Subscription;
}

type Tables = BTreeMap<Collection, BTreeMap<String, Map<String, Value>>>;

const LOCK_ATTEMPTS: u32 = 100;
const LOCK_RETRY: Duration = Duration::from_millis(50);

fn stamp(fields: &mut Map<String, Value>, actor: UserId) {
    fields.insert(LAST_EDITED_BY.to_string(), Value::from(actor.as_str()));
    fields.insert(UPDATED_AT.to_string(), Value::from(Utc::now().to_rfc3339()));
}

/// One change to one document.
enum Write {
    Create(FieldPatch, UserId),
    Update(FieldPatch, UserId),
    Delete,
}

/// Apply `write` to `tables`, returning the document's fields afterwards
/// (`None` once deleted). `tables` is untouched on error.
fn apply(
    tables: &mut Tables,
    collection: Collection,
    id: &str,
    write: Write,
) -> Result<Option<Map<String, Value>>> {
    let missing = || Error::NotFound(format!("{}/{}", collection, id));
    match write {
        Write::Create(mut fields, actor) => {
            stamp(&mut fields, actor);
            tables
                .entry(collection)
                .or_default()
                .insert(id.to_string(), fields.clone());
            debug!("{} created {}/{}", actor, collection, id);
            Ok(Some(fields))
        }
        Write::Update(patch, actor) => {
            let fields = tables
                .get_mut(&collection)
                .and_then(|t| t.get_mut(id))
                .ok_or_else(missing)?;
            let keys: Vec<_> = patch.keys().cloned().collect();
            fields.extend(patch);
            stamp(fields, actor);
            debug!("{} updated {}/{} {:?}", actor, collection, id, keys);
            Ok(Some(fields.clone()))
        }
        Write::Delete => {
            tables
                .get_mut(&collection)
                .and_then(|t| t.remove(id))
                .ok_or_else(missing)?;
            debug!("deleted {}/{}", collection, id);
            Ok(None)
        }
    }
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
    changes: broadcast::Sender<Change>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_tables(Tables::new())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tables(tables: Tables) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            tables: Mutex::new(tables),
            changes,
        }
    }

    fn publish(&self, collection: Collection, id: &str, fields: Option<Map<String, Value>>) {
        /* nobody listening is fine */
        let _ = self.changes.send(Change {
            collection,
            id: id.to_string(),
            document: fields.map(|fields| Document {
                id: id.to_string(),
                fields,
            }),
        });
    }

    async fn write(&self, collection: Collection, id: &str, write: Write) -> Result<()> {
        let fields = {
            let mut tables = self.tables.lock().await;
            apply(&mut tables, collection, id, write)?
        };
        self.publish(collection, id, fields);
        Ok(())
    }

    async fn replace(&self, tables: Tables) {
        *self.tables.lock().await = tables;
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .get(&collection)
            .and_then(|t| t.get(id))
            .map(|fields| Document {
                id: id.to_string(),
                fields: fields.clone(),
            }))
    }

    async fn create(
        &self,
        collection: Collection,
        fields: FieldPatch,
        actor: UserId,
    ) -> Result<String> {
        let id = new_id();
        self.write(collection, &id, Write::Create(fields, actor)).await?;
        Ok(id)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: FieldPatch,
        actor: UserId,
    ) -> Result<()> {
        self.write(collection, id, Write::Update(patch, actor)).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.write(collection, id, Write::Delete).await
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Document>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .get(&collection)
            .map(|t| {
                t.iter()
                    .map(|(id, fields)| Document {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn subscribe(&self, collection: Collection, id: &str) -> Subscription {
        Subscription {
            collection,
            id: id.to_string(),
            changes: self.changes.subscribe(),
        }
    }
}

/// `<path><suffix>`, next to the store file.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Exclusive hold on a store file across handles and processes, released on drop.
struct LockFile(PathBuf);

impl LockFile {
    async fn acquire(path: PathBuf) -> Result<Self> {
        for _ in 0..LOCK_ATTEMPTS {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok(Self(path)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tokio::time::sleep(LOCK_RETRY).await
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(Error::Store(format!("{} is held by another writer", path.display())))
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            warn!("could not release {}: {}", self.0.display(), e);
        }
    }
}

/// A store backed by one JSON file.
///
/// Reads come from the copy loaded at open (or at this handle's last write).
/// Every write re-reads the file under a lock, applies its one change, and
/// replaces the file; only then does the cached copy move and subscribers
/// hear about it. A write that fails leaves cache, subscribers and file as
/// they were. Other handles' documents are never overwritten.
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
    /* orders this handle's own writes without polling the lock file */
    writing: Mutex<()>,
}

impl FileStore {
    /// Load the store at `path`, starting empty if the file does not exist yet.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = Self::load(&path).await?;
        info!("opened store at {}", path.display());
        Ok(Self {
            path,
            inner: MemoryStore::with_tables(tables),
            writing: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(path: &Path) -> Result<Tables> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Tables::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, collection: Collection, id: &str, write: Write) -> Result<()> {
        let _writing = self.writing.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let _lock = LockFile::acquire(sibling(&self.path, ".lock")).await?;

        let mut tables = Self::load(&self.path).await?;
        let fields = apply(&mut tables, collection, id, write)?;

        let tmp = sibling(&self.path, ".tmp");
        tokio::fs::write(&tmp, serde_json::to_string_pretty(&tables)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("wrote {}", self.path.display());

        self.inner.replace(tables).await;
        self.inner.publish(collection, id, fields);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        self.inner.get(collection, id).await
    }

    async fn create(
        &self,
        collection: Collection,
        fields: FieldPatch,
        actor: UserId,
    ) -> Result<String> {
        let id = new_id();
        self.write(collection, &id, Write::Create(fields, actor)).await?;
        Ok(id)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: FieldPatch,
        actor: UserId,
    ) -> Result<()> {
        self.write(collection, id, Write::Update(patch, actor)).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        self.write(collection, id, Write::Delete).await
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Document>> {
        self.inner.list(collection).await
    }

    fn subscribe(&self, collection: Collection, id: &str) -> Subscription {
        self.inner.subscribe(collection, id)
    }
}
