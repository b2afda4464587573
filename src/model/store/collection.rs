use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use rocket::{
    request::{self, FromRequest, Request},
    State,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::db::{
    Candidate, ChatMessage, Invite, ParticipationRequest, Position, Session, Settings, User, Vote,
};

use super::Id;

/// A failure to get data into the store file. Reads never fail: corrupt or
/// missing data degrades to an empty collection instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to write the store file: {0}")]
    Write(#[from] io::Error),
    #[error("Failed to encode store contents: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A type that can be kept in a named store collection.
pub trait Record: Serialize + DeserializeOwned {
    /// The name of the collection.
    const COLLECTION: &'static str;

    /// The record's unique identifier.
    fn id(&self) -> Id;
}

/// The persisted record store: named collections of records plus the
/// settings singleton, all held in one JSON file.
///
/// Every mutation rewrites the file synchronously, and all access funnels
/// through one process-wide lock, so each operation is its own transactional
/// boundary. Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    data: Mutex<Map<String, Value>>,
}

const SETTINGS: &str = "settings";

impl Store {
    /// Open the store at the given path. A missing file starts empty; a
    /// malformed one is logged and also starts empty rather than failing.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Map<String, Value>>(&bytes) {
                Ok(map) => map,
                Err(e) => {
                    warn!(
                        "Store file {} is malformed, starting empty: {e}",
                        path.display()
                    );
                    Map::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                warn!("Could not read store file {}: {e}", path.display());
                Map::new()
            }
        };
        Store {
            inner: Arc::new(StoreInner {
                path,
                data: Mutex::new(data),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.inner.data.lock().expect("store lock poisoned")
    }

    fn persist(&self, data: &Map<String, Value>) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(data)?;
        fs::write(&self.inner.path, body)?;
        Ok(())
    }

    /// Decode one collection, degrading to empty on malformed contents.
    fn decode<T: Record>(value: Option<&Value>) -> Vec<T> {
        match value {
            None => Vec::new(),
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                warn!(
                    "Collection '{}' is malformed, treating as empty: {e}",
                    T::COLLECTION
                );
                Vec::new()
            }),
        }
    }

    fn read<T: Record>(&self) -> Vec<T> {
        let data = self.lock();
        Self::decode(data.get(T::COLLECTION))
    }

    /// Run `f` over the decoded collection under the store lock, writing the
    /// result back and persisting iff `f` returns `Some`.
    fn mutate<T: Record, R>(
        &self,
        f: impl FnOnce(&mut Vec<T>) -> Option<R>,
    ) -> Result<Option<R>, StoreError> {
        let mut data = self.lock();
        let mut records: Vec<T> = Self::decode(data.get(T::COLLECTION));
        let result = f(&mut records);
        if result.is_some() {
            data.insert(T::COLLECTION.to_string(), serde_json::to_value(&records)?);
            self.persist(&data)?;
        }
        Ok(result)
    }

    /// The settings singleton, falling back to defaults when absent or
    /// malformed.
    pub fn settings(&self) -> Settings {
        let data = self.lock();
        match data.get(SETTINGS) {
            None => Settings::default(),
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                warn!("Settings record is malformed, using defaults: {e}");
                Settings::default()
            }),
        }
    }

    /// Replace the settings singleton.
    pub fn put_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        let mut data = self.lock();
        data.insert(SETTINGS.to_string(), serde_json::to_value(settings)?);
        self.persist(&data)
    }

    /// Whether the settings singleton has been written yet.
    pub fn has_settings(&self) -> bool {
        self.lock().contains_key(SETTINGS)
    }
}

/// A typed handle on one store collection.
pub struct Coll<T> {
    store: Store,
    phantom: PhantomData<fn() -> T>,
}

impl<T: Record> Coll<T> {
    /// Get a handle on this collection in the given store.
    pub fn from_store(store: &Store) -> Self {
        Self {
            store: store.clone(),
            phantom: PhantomData,
        }
    }

    /// All records, in insertion order.
    pub fn all(&self) -> Vec<T> {
        self.store.read()
    }

    /// The record with the given id, if any.
    pub fn get(&self, id: Id) -> Option<T> {
        self.all().into_iter().find(|record| record.id() == id)
    }

    /// Replace the whole collection.
    pub fn save(&self, records: Vec<T>) -> Result<(), StoreError> {
        self.store
            .mutate(move |all| {
                *all = records;
                Some(())
            })
            .map(|_| ())
    }

    /// Append a record.
    pub fn insert(&self, record: T) -> Result<(), StoreError> {
        self.store
            .mutate(move |all| {
                all.push(record);
                Some(())
            })
            .map(|_| ())
    }

    /// Apply `f` to the matching record. Returns false, without touching the
    /// file, when no record matches.
    pub fn modify(&self, id: Id, f: impl FnOnce(&mut T)) -> Result<bool, StoreError> {
        let modified = self.store.mutate(|all| {
            all.iter_mut().find(|record| record.id() == id).map(f)
        })?;
        Ok(modified.is_some())
    }

    /// Remove the matching record. Returns false, without touching the file,
    /// when no record matches.
    pub fn remove(&self, id: Id) -> Result<bool, StoreError> {
        let removed = self.store.mutate(|all| {
            let before = all.len();
            all.retain(|record| record.id() != id);
            (all.len() != before).then_some(())
        })?;
        Ok(removed.is_some())
    }

    /// Remove every record matching the predicate. Returns how many went.
    pub fn remove_where(&self, pred: impl Fn(&T) -> bool) -> Result<usize, StoreError> {
        let removed = self.store.mutate(|all| {
            let before = all.len();
            all.retain(|record| !pred(record));
            let gone = before - all.len();
            (gone > 0).then_some(gone)
        })?;
        Ok(removed.unwrap_or(0))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            phantom: PhantomData,
        }
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: Record,
{
    type Error = ();

    /// Get the store from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Store`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let store = req.guard::<&State<Store>>().await.unwrap();
        request::Outcome::Success(Coll::from_store(store))
    }
}

impl Record for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> Id {
        self.id
    }
}

impl Record for Session {
    const COLLECTION: &'static str = "sessions";

    fn id(&self) -> Id {
        self.id
    }
}

impl Record for Position {
    const COLLECTION: &'static str = "positions";

    fn id(&self) -> Id {
        self.id
    }
}

impl Record for Candidate {
    const COLLECTION: &'static str = "candidates";

    fn id(&self) -> Id {
        self.id
    }
}

impl Record for Vote {
    const COLLECTION: &'static str = "votes";

    fn id(&self) -> Id {
        self.id
    }
}

impl Record for ParticipationRequest {
    const COLLECTION: &'static str = "requests";

    fn id(&self) -> Id {
        self.id
    }
}

impl Record for ChatMessage {
    const COLLECTION: &'static str = "chats";

    fn id(&self) -> Id {
        self.id
    }
}

impl Record for Invite {
    const COLLECTION: &'static str = "invites";

    fn id(&self) -> Id {
        self.id
    }
}
