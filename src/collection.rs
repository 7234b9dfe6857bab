// On-chain action runtime for the Stories mobile app
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2025 by the Stories app developers
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except
// in compliance with the License. You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License
// is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express
// or implied. See the License for the specific language governing permissions and limitations under
// the License.

//! Named, deduplicated and optionally capped lists of user records kept in the local key-value
//! store. The in-memory copy is authoritative for the session; persistence is best-effort.

use std::any::Any;
use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use nonasync::persistence::{PersistenceError, PersistenceProvider};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{KeyValueStore, StoreError};

/// Record which may be kept in a [`Collection`].
pub trait CollectionEntry: Clone + Debug + Serialize + DeserializeOwned + 'static {
    /// Deduplication key.
    type Key: Clone + Eq + Hash + Debug + 'static;

    fn key(&self) -> Self::Key;
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum ListOrder {
    /// Upserted entries move to the front; eviction drops the tail.
    #[default]
    MostRecentFirst,
    /// Entries keep their first insertion position; eviction drops the head.
    Insertion,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ListSpec {
    /// Storage key of the list.
    pub name: &'static str,
    pub cap: Option<usize>,
    pub order: ListOrder,
}

impl ListSpec {
    pub const fn new(name: &'static str, cap: Option<usize>, order: ListOrder) -> Self {
        Self { name, cap, order }
    }

    pub const fn with_cap(mut self, cap: usize) -> Self {
        self.cap = Some(cap);
        self
    }
}

pub const RECENTS: ListSpec = ListSpec::new("search:recent", Some(8), ListOrder::MostRecentFirst);
pub const HISTORY: ListSpec = ListSpec::new("history:items", None, ListOrder::Insertion);

#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
enum SlotError {
    /// no list is stored under the key yet.
    Absent,

    /// stored list is corrupted: {0}
    #[from]
    Corrupt(serde_json::Error),

    /// {0}
    #[from]
    Store(StoreError),
}

impl SlotError {
    fn into_persistence(self) -> PersistenceError { PersistenceError(Box::new(self)) }
}

/// A single list serialized as JSON under one store key.
#[derive(Debug)]
struct ListSlot<'store, S: KeyValueStore, E> {
    store: &'store S,
    key: &'static str,
    _entry: PhantomData<fn() -> E>,
}

impl<'store, S: KeyValueStore, E> ListSlot<'store, S, E> {
    fn new(store: &'store S, key: &'static str) -> Self {
        Self {
            store,
            key,
            _entry: PhantomData,
        }
    }
}

impl<S: KeyValueStore, E: CollectionEntry> PersistenceProvider<Vec<E>> for ListSlot<'_, S, E> {
    fn load(&self) -> Result<Vec<E>, PersistenceError> {
        let data = self
            .store
            .get(self.key)
            .map_err(|err| SlotError::from(err).into_persistence())?
            .ok_or_else(|| SlotError::Absent.into_persistence())?;
        serde_json::from_str(&data).map_err(|err| SlotError::from(err).into_persistence())
    }

    fn store(&self, object: &Vec<E>) -> Result<(), PersistenceError> {
        let data = serde_json::to_string(object)
            .map_err(|err| SlotError::from(err).into_persistence())?;
        self.store
            .set(self.key, &data)
            .map_err(|err| SlotError::from(err).into_persistence())
    }
}

type Entries<E> = IndexMap<<E as CollectionEntry>::Key, E>;

/// Entry point to all the lists kept in one store.
///
/// Each list is read from the store once, on first use, and then kept in memory for the rest of
/// the session. Every handle opened on the same list works on that single copy, so a failed write
/// never makes the session lose its changes.
#[derive(Debug)]
pub struct CollectionManager<S: KeyValueStore> {
    store: S,
    lists: RefCell<HashMap<&'static str, Box<dyn Any>>>,
}

impl<S: KeyValueStore> CollectionManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            lists: empty!(),
        }
    }

    pub fn store(&self) -> &S { &self.store }

    /// Returns the session copy of the list. A list which is missing in the store, or whose
    /// stored data is corrupted, starts empty.
    pub fn load<E: CollectionEntry>(&self, spec: ListSpec) -> Vec<E> {
        self.open::<E>(spec).to_vec()
    }

    pub fn open<E: CollectionEntry>(&self, spec: ListSpec) -> Collection<'_, E, S> {
        self.with_entries::<E, _>(spec, None, |_| ());
        Collection::new(self, spec)
    }

    /// Opens the list, using `seed` when nothing was ever stored under the list key. The seed is
    /// persisted right away, so it is used only once. A list already open in this session ignores
    /// the seed.
    pub fn open_seeded<E: CollectionEntry>(
        &self,
        spec: ListSpec,
        seed: impl IntoIterator<Item = E>,
    ) -> Collection<'_, E, S> {
        self.with_entries::<E, _>(spec, Some(seed.into_iter().collect()), |_| ());
        Collection::new(self, spec)
    }

    pub fn upsert<E: CollectionEntry>(&self, spec: ListSpec, entry: E) -> Vec<E> {
        let mut collection = self.open(spec);
        collection.upsert(entry);
        collection.to_vec()
    }

    pub fn remove<E: CollectionEntry>(&self, spec: ListSpec, key: &E::Key) -> Vec<E> {
        let mut collection = self.open(spec);
        collection.remove(key);
        collection.to_vec()
    }

    pub fn clear<E: CollectionEntry>(&self, spec: ListSpec) { self.open::<E>(spec).clear(); }

    /// Runs `f` over the session copy of the list, reading it from the store first if this is
    /// the first use of the list (or if it was last opened with another entry type).
    fn with_entries<E: CollectionEntry, R>(
        &self,
        spec: ListSpec,
        seed: Option<Vec<E>>,
        f: impl FnOnce(&mut Entries<E>) -> R,
    ) -> R {
        let mut lists = self.lists.borrow_mut();
        let mut entries = match lists.remove(spec.name).map(|list| list.downcast::<Entries<E>>()) {
            Some(Ok(entries)) => *entries,
            Some(Err(_)) => {
                debug!("List `{}` reopened with another entry type", spec.name);
                self.read(spec, seed)
            }
            None => self.read(spec, seed),
        };
        let res = f(&mut entries);
        lists.insert(spec.name, Box::new(entries));
        res
    }

    fn read<E: CollectionEntry>(&self, spec: ListSpec, seed: Option<Vec<E>>) -> Entries<E> {
        let slot = ListSlot::<S, E>::new(&self.store, spec.name);
        let (list, seeded) = match slot.load() {
            Ok(list) => (list, false),
            Err(PersistenceError(err)) => match err.downcast_ref::<SlotError>() {
                Some(SlotError::Absent) => (seed.unwrap_or_default(), true),
                _ => {
                    warn!("Unable to read list `{}`, starting with an empty one: {err}", spec.name);
                    (vec![], false)
                }
            },
        };

        let mut entries: Entries<E> = list.into_iter().map(|entry| (entry.key(), entry)).collect();
        enforce_cap(&mut entries, spec);
        if seeded && !entries.is_empty() {
            debug!("Seeding list `{}` with {} entries", spec.name, entries.len());
            self.persist(spec, &entries);
        }
        entries
    }

    /// Applies a mutation to the session copy and writes the whole list back once.
    fn mutate<E: CollectionEntry, R>(
        &self,
        spec: ListSpec,
        f: impl FnOnce(&mut Entries<E>) -> R,
    ) -> R {
        self.with_entries::<E, _>(spec, None, |entries| {
            let res = f(entries);
            enforce_cap(entries, spec);
            self.persist(spec, entries);
            res
        })
    }

    fn persist<E: CollectionEntry>(&self, spec: ListSpec, entries: &Entries<E>) {
        let slot = ListSlot::<S, E>::new(&self.store, spec.name);
        let list: Vec<E> = entries.values().cloned().collect();
        if let Err(PersistenceError(err)) = slot.store(&list) {
            warn!(
                "Unable to save list `{}`, keeping changes in memory only: {err}",
                spec.name
            );
        }
    }
}

fn enforce_cap<E: CollectionEntry>(entries: &mut Entries<E>, spec: ListSpec) {
    let Some(cap) = spec.cap else { return };
    match spec.order {
        ListOrder::MostRecentFirst => entries.truncate(cap),
        ListOrder::Insertion => {
            let excess = entries.len().saturating_sub(cap);
            entries.drain(..excess);
        }
    }
}

/// Handle on a single list of a [`CollectionManager`]. Handles on the same list share its session
/// copy; each mutation writes the list back to the store.
#[derive(Debug)]
pub struct Collection<'mgr, E: CollectionEntry, S: KeyValueStore> {
    manager: &'mgr CollectionManager<S>,
    spec: ListSpec,
    _entry: PhantomData<fn() -> E>,
}

impl<'mgr, E: CollectionEntry, S: KeyValueStore> Collection<'mgr, E, S> {
    fn new(manager: &'mgr CollectionManager<S>, spec: ListSpec) -> Self {
        Self {
            manager,
            spec,
            _entry: PhantomData,
        }
    }

    pub fn spec(&self) -> ListSpec { self.spec }

    fn read<R>(&self, f: impl FnOnce(&Entries<E>) -> R) -> R {
        self.manager.with_entries::<E, _>(self.spec, None, |entries| f(entries))
    }

    pub fn to_vec(&self) -> Vec<E> { self.read(|entries| entries.values().cloned().collect()) }

    pub fn len(&self) -> usize { self.read(|entries| entries.len()) }

    pub fn is_empty(&self) -> bool { self.read(|entries| entries.is_empty()) }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + Hash + Eq,
        E::Key: Borrow<Q>,
    {
        self.read(|entries| entries.contains_key(key))
    }

    pub fn get<Q>(&self, key: &Q) -> Option<E>
    where
        Q: ?Sized + Hash + Eq,
        E::Key: Borrow<Q>,
    {
        self.read(|entries| entries.get(key).cloned())
    }

    /// Inserts the entry or replaces the one with the same key, evicting past the cap.
    pub fn upsert(&mut self, entry: E) {
        let order = self.spec.order;
        self.manager.mutate(self.spec, |entries: &mut Entries<E>| {
            let key = entry.key();
            match order {
                ListOrder::MostRecentFirst => {
                    entries.shift_remove(&key);
                    entries.shift_insert(0, key, entry);
                }
                ListOrder::Insertion => {
                    entries.insert(key, entry);
                }
            }
        })
    }

    /// Removes the entry; returns whether it was present. Persists even when nothing was removed.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        Q: ?Sized + Hash + Eq,
        E::Key: Borrow<Q>,
    {
        self.manager
            .mutate(self.spec, |entries: &mut Entries<E>| entries.shift_remove(key).is_some())
    }

    pub fn clear(&mut self) {
        self.manager.mutate(self.spec, |entries: &mut Entries<E>| entries.clear())
    }
}

/// A previously submitted search query.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Display)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate", transparent)]
#[display(inner)]
pub struct RecentSearch(String);

impl RecentSearch {
    /// Blank queries are not remembered.
    pub fn new(query: &str) -> Option<Self> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        Some(Self(query.to_owned()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl CollectionEntry for RecentSearch {
    type Key = String;

    fn key(&self) -> String { self.0.clone() }
}

impl<S: KeyValueStore> Collection<'_, RecentSearch, S> {
    /// Remembers the query as the most recent one; returns `false` for a blank query.
    pub fn push_query(&mut self, query: &str) -> bool {
        match RecentSearch::new(query) {
            Some(search) => {
                self.upsert(search);
                true
            }
            None => false,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Display)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "lowercase")]
#[display(lowercase)]
pub enum WatchStatus {
    #[default]
    Watching,
    Completed,
}

impl FromStr for WatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "watching" => Ok(WatchStatus::Watching),
            "completed" => Ok(WatchStatus::Completed),
            s => Err(s.to_string()),
        }
    }
}

impl WatchStatus {
    pub fn toggled(self) -> Self {
        match self {
            WatchStatus::Watching => WatchStatus::Completed,
            WatchStatus::Completed => WatchStatus::Watching,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_uri: Option<String>,
    /// Percentage watched, `0..=100`.
    pub progress: u8,
    pub status: WatchStatus,
    pub updated_at: DateTime<Utc>,
}

impl HistoryItem {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        progress: u8,
        status: WatchStatus,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            poster_uri: None,
            progress: progress.min(100),
            status,
            updated_at,
        }
    }

    pub fn with_poster(mut self, uri: impl Into<String>) -> Self {
        self.poster_uri = Some(uri.into());
        self
    }
}

impl CollectionEntry for HistoryItem {
    type Key = String;

    fn key(&self) -> String { self.id.clone() }
}

impl<S: KeyValueStore> Collection<'_, HistoryItem, S> {
    /// Flips watching/completed and refreshes the update time; `false` if there is no such item.
    pub fn toggle_status(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.manager.mutate(self.spec, |entries: &mut Entries<HistoryItem>| {
            if let Some(item) = entries.get_mut(id) {
                item.status = item.status.toggled();
                item.updated_at = Utc::now();
            }
        });
        true
    }

    /// Items with the given status (any, if `None`) whose title contains `query`, ignoring case.
    pub fn search(&self, status: Option<WatchStatus>, query: &str) -> Vec<HistoryItem> {
        let query = query.trim().to_lowercase();
        self.read(|entries| {
            entries
                .values()
                .filter(|item| status.map_or(true, |status| item.status == status))
                .filter(|item| query.is_empty() || item.title.to_lowercase().contains(&query))
                .cloned()
                .collect()
        })
    }
}
