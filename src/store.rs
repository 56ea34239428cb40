use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::attribute::{
    AclId, AttrId, AttrValue, Attribute, IdGenerator, IdHasher, ListEntry, ListEntryKey,
    MapEntry, MapEntryKey, StoredAttr, ValueMap,
};
use crate::config::{StorageMode, StoreConfig};
use crate::error::{AttrError, Result};
use crate::kind::AttrKind;
use crate::persist::Persistor;
use crate::query::AttrQuery;

// ------------- Session cache -------------
// Keeps materialized scalar rows so repeated reads of the same subtree skip
// the database. Containers are assembled fresh on every materialize, so a
// structural mutation only ever invalidates the rows it touched.
#[derive(Debug)]
pub struct SessionCache {
    cached: HashMap<AttrId, AttrValue, IdHasher>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self {
            cached: HashMap::default(),
        }
    }
    fn get(&self, id: AttrId) -> Option<&AttrValue> {
        self.cached.get(&id)
    }
    fn put(&mut self, id: AttrId, value: AttrValue) {
        self.cached.insert(id, value);
    }
    fn evict(&mut self, id: AttrId) -> bool {
        self.cached.remove(&id).is_some()
    }
    pub fn len(&self) -> usize {
        self.cached.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cached.is_empty()
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn lock<T>(mutex: &Arc<Mutex<T>>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|e| AttrError::Lock(e.to_string()))
}

// ------------- Store -------------
// This sets up the attribute store with the necessary structures
pub struct AttrStore {
    // responsible for the persistence layer
    pub(crate) persistor: Arc<Mutex<Persistor>>,
    // owns the identity generator
    pub(crate) id_generator: Arc<Mutex<IdGenerator>>,
    // owns the session cache
    pub(crate) cache: Arc<Mutex<SessionCache>>,
    max_text_length: usize,
}

impl AttrStore {
    pub fn open(config: &StoreConfig) -> Result<AttrStore> {
        let persistor = match config.storage() {
            StorageMode::InMemory => Persistor::in_memory()?,
            StorageMode::File(path) => Persistor::open(&path)?,
        };
        let mut generator = IdGenerator::new();
        generator.retain(persistor.max_attribute_identity()?);
        info!(
            max_text_length = config.max_text_length,
            "attribute store opened"
        );
        Ok(AttrStore {
            persistor: Arc::new(Mutex::new(persistor)),
            id_generator: Arc::new(Mutex::new(generator)),
            cache: Arc::new(Mutex::new(SessionCache::new())),
            max_text_length: config.max_text_length,
        })
    }

    pub fn in_memory() -> Result<AttrStore> {
        AttrStore::open(&StoreConfig::default())
    }

    pub fn max_text_length(&self) -> usize {
        self.max_text_length
    }

    pub(crate) fn next_id(&self) -> Result<AttrId> {
        Ok(lock(&self.id_generator)?.generate())
    }

    // ------------- Creation -------------

    /// Persists a value-form attribute tree and returns the handle of its
    /// root. Construction of the handle itself never touches the database;
    /// this is the only way an attribute row comes into being.
    pub fn create(&self, value: &AttrValue) -> Result<StoredAttr> {
        self.create_with_acl(value, None)
    }

    pub fn create_with_acl(&self, value: &AttrValue, acl: Option<AclId>) -> Result<StoredAttr> {
        let persistor = lock(&self.persistor)?;
        let stored = self.create_inner(&persistor, value, acl)?;
        debug!(id = stored.id(), kind = %stored.kind(), "created attribute");
        Ok(stored)
    }

    pub(crate) fn create_inner(
        &self,
        persistor: &Persistor,
        value: &AttrValue,
        acl: Option<AclId>,
    ) -> Result<StoredAttr> {
        let id = self.next_id()?;
        match value {
            // an over-long text would overflow the value column, so it is
            // persisted as the blob of its UTF-8 bytes instead
            AttrValue::Text(s) if s.len() > self.max_text_length => {
                let blob = AttrValue::Blob(s.as_bytes().to_vec());
                persistor.add_attribute(id, AttrKind::Blob, &blob, acl)?;
                Ok(StoredAttr::new(id, 0, AttrKind::Blob, acl))
            }
            AttrValue::List(items) => {
                persistor.add_attribute(id, AttrKind::List, value, acl)?;
                for (index, item) in items.iter().enumerate() {
                    let child = self.create_inner(persistor, item, None)?;
                    persistor.add_list_entry(id, index as i64, child.id())?;
                }
                Ok(StoredAttr::new(id, 0, AttrKind::List, acl))
            }
            AttrValue::Map(entries) => {
                persistor.add_attribute(id, AttrKind::Map, value, acl)?;
                for (key, item) in entries {
                    let child = self.create_inner(persistor, item, None)?;
                    persistor.add_map_entry(id, key, child.id())?;
                }
                Ok(StoredAttr::new(id, 0, AttrKind::Map, acl))
            }
            _ => {
                persistor.add_attribute(id, value.kind(), value, acl)?;
                Ok(StoredAttr::new(id, 0, value.kind(), acl))
            }
        }
    }

    /// Fetches the handle for a persisted identity.
    pub fn load(&self, id: AttrId) -> Result<StoredAttr> {
        let persistor = lock(&self.persistor)?;
        let row = persistor
            .get_attribute(id)?
            .ok_or_else(|| AttrError::InvalidArgument(format!("no attribute with identity {id}")))?;
        Ok(StoredAttr::new(id, row.version, row.kind, row.acl))
    }

    // ------------- Materialization -------------

    /// Rebuilds the value form of a stored attribute tree.
    pub fn materialize(&self, attr: &StoredAttr) -> Result<AttrValue> {
        let persistor = lock(&self.persistor)?;
        let mut cache = lock(&self.cache)?;
        self.materialize_inner(&persistor, &mut cache, attr.id())
    }

    pub(crate) fn materialize_inner(
        &self,
        persistor: &Persistor,
        cache: &mut SessionCache,
        id: AttrId,
    ) -> Result<AttrValue> {
        if let Some(value) = cache.get(id) {
            return Ok(value.clone());
        }
        let row = persistor
            .get_attribute(id)?
            .ok_or_else(|| AttrError::InvalidArgument(format!("no attribute with identity {id}")))?;
        match row.kind {
            AttrKind::List => {
                let mut items = Vec::new();
                for (position, (index, child)) in
                    persistor.list_entries(id)?.into_iter().enumerate()
                {
                    if index != position as i64 {
                        return Err(AttrError::Corruption {
                            message: format!("list {id} has a gap at index {position}"),
                        });
                    }
                    items.push(self.materialize_inner(persistor, cache, child)?);
                }
                Ok(AttrValue::List(items))
            }
            AttrKind::Map => {
                let mut entries = ValueMap::default();
                for (key, child) in persistor.map_entries(id)? {
                    let value = self.materialize_inner(persistor, cache, child)?;
                    entries.insert(key, value);
                }
                Ok(AttrValue::Map(entries))
            }
            _ => {
                let value = row.scalar.ok_or_else(|| AttrError::Corruption {
                    message: format!("attribute {id} has no scalar payload"),
                })?;
                cache.put(id, value.clone());
                Ok(value)
            }
        }
    }

    // ------------- Duplication -------------

    /// Deep stored-to-stored copy. Every node keeps its own ACL reference;
    /// the copies start over at version 0.
    pub fn duplicate(&self, attr: &StoredAttr) -> Result<StoredAttr> {
        let persistor = lock(&self.persistor)?;
        let copy = self.duplicate_inner(&persistor, attr.id())?;
        debug!(source = attr.id(), copy = copy.id(), "duplicated attribute");
        Ok(copy)
    }

    fn duplicate_inner(&self, persistor: &Persistor, id: AttrId) -> Result<StoredAttr> {
        let row = persistor
            .get_attribute(id)?
            .ok_or_else(|| AttrError::InvalidArgument(format!("no attribute with identity {id}")))?;
        let copy = self.next_id()?;
        match row.kind {
            AttrKind::List => {
                persistor.add_attribute(copy, AttrKind::List, &AttrValue::list(), row.acl)?;
                for (index, child) in persistor.list_entries(id)? {
                    let child_copy = self.duplicate_inner(persistor, child)?;
                    persistor.add_list_entry(copy, index, child_copy.id())?;
                }
            }
            AttrKind::Map => {
                persistor.add_attribute(copy, AttrKind::Map, &AttrValue::map(), row.acl)?;
                for (key, child) in persistor.map_entries(id)? {
                    let child_copy = self.duplicate_inner(persistor, child)?;
                    persistor.add_map_entry(copy, &key, child_copy.id())?;
                }
            }
            _ => {
                let scalar = row.scalar.ok_or_else(|| AttrError::Corruption {
                    message: format!("attribute {id} has no scalar payload"),
                })?;
                persistor.add_attribute(copy, row.kind, &scalar, row.acl)?;
            }
        }
        Ok(StoredAttr::new(copy, 0, row.kind, row.acl))
    }

    // ------------- Mutation -------------

    /// Writes a new scalar payload, guarded by the handle's version. On
    /// success the handle's version is advanced in place.
    pub fn save(&self, attr: &mut StoredAttr, value: &AttrValue) -> Result<()> {
        if !attr.kind().is_scalar() {
            return Err(AttrError::Unsupported {
                kind: attr.kind(),
                op: "save",
            });
        }
        if value.kind() != attr.kind() {
            return Err(AttrError::Conversion {
                requested: attr.kind(),
                actual: value.kind().name().to_owned(),
                rendered: value.to_string(),
            });
        }
        if let AttrValue::Text(s) = value
            && s.len() > self.max_text_length
        {
            return Err(AttrError::InvalidArgument(format!(
                "text of {} bytes exceeds the configured maximum of {}",
                s.len(),
                self.max_text_length
            )));
        }
        let persistor = lock(&self.persistor)?;
        let mut cache = lock(&self.cache)?;
        let updated = persistor.update_scalar(attr.id(), value, attr.version())?;
        if !updated {
            return Err(AttrError::VersionConflict {
                id: attr.id(),
                expected: attr.version(),
            });
        }
        cache.evict(attr.id());
        attr.bump_version();
        Ok(())
    }

    /// Recursively deletes a stored attribute tree: children first, entry
    /// rows next, the attribute row last.
    pub fn delete(&self, attr: &StoredAttr) -> Result<()> {
        let persistor = lock(&self.persistor)?;
        let mut cache = lock(&self.cache)?;
        self.delete_inner(&persistor, &mut cache, attr.id())?;
        debug!(id = attr.id(), "deleted attribute");
        Ok(())
    }

    pub(crate) fn delete_inner(
        &self,
        persistor: &Persistor,
        cache: &mut SessionCache,
        id: AttrId,
    ) -> Result<()> {
        let row = persistor
            .get_attribute(id)?
            .ok_or_else(|| AttrError::InvalidArgument(format!("no attribute with identity {id}")))?;
        match row.kind {
            AttrKind::List => {
                for (_, child) in persistor.list_entries(id)? {
                    self.delete_inner(persistor, cache, child)?;
                }
                persistor.clear_list(id)?;
            }
            AttrKind::Map => {
                for (_, child) in persistor.map_entries(id)? {
                    self.delete_inner(persistor, cache, child)?;
                }
                persistor.clear_map(id)?;
            }
            _ => (),
        }
        persistor.remove_attribute(id)?;
        cache.evict(id);
        Ok(())
    }

    // ------------- Container views -------------

    pub fn list(&self, attr: &StoredAttr) -> Result<StoredList<'_>> {
        if attr.kind() != AttrKind::List {
            return Err(AttrError::Unsupported {
                kind: attr.kind(),
                op: "list",
            });
        }
        Ok(StoredList {
            store: self,
            attr: attr.clone(),
        })
    }

    pub fn map(&self, attr: &StoredAttr) -> Result<StoredMap<'_>> {
        if attr.kind() != AttrKind::Map {
            return Err(AttrError::Unsupported {
                kind: attr.kind(),
                op: "map",
            });
        }
        Ok(StoredMap {
            store: self,
            attr: attr.clone(),
        })
    }

    // ------------- Predicate queries -------------

    /// Materializes every entry of a stored map whose key satisfies the
    /// query.
    pub fn find(&self, map: &StoredAttr, query: &AttrQuery) -> Result<Vec<(String, AttrValue)>> {
        if map.kind() != AttrKind::Map {
            return Err(AttrError::Unsupported {
                kind: map.kind(),
                op: "find",
            });
        }
        let persistor = lock(&self.persistor)?;
        let mut cache = lock(&self.cache)?;
        let predicate = query.predicate();
        let mut results = Vec::new();
        for (key, child) in persistor.find_map_entries(map.id(), &predicate)? {
            let value = self.materialize_inner(&persistor, &mut cache, child)?;
            results.push((key, value));
        }
        debug!(map = map.id(), matched = results.len(), "predicate find");
        Ok(results)
    }

    /// Recursively deletes every entry of a stored map whose key satisfies
    /// the query; returns how many entries went away.
    pub fn delete_matching(&self, map: &StoredAttr, query: &AttrQuery) -> Result<usize> {
        if map.kind() != AttrKind::Map {
            return Err(AttrError::Unsupported {
                kind: map.kind(),
                op: "delete_matching",
            });
        }
        let persistor = lock(&self.persistor)?;
        let mut cache = lock(&self.cache)?;
        let predicate = query.predicate();
        let matched = persistor.find_map_entries(map.id(), &predicate)?;
        for (key, child) in &matched {
            self.delete_inner(&persistor, &mut cache, *child)?;
            persistor.remove_map_entry(map.id(), key)?;
        }
        if !matched.is_empty() {
            persistor.touch_version(map.id())?;
        }
        Ok(matched.len())
    }

    // ------------- Cache control -------------

    /// Detaches a whole stored subtree from the session cache. The rows are
    /// untouched; the next materialize re-reads them.
    pub fn evict(&self, attr: &StoredAttr) -> Result<()> {
        let persistor = lock(&self.persistor)?;
        let mut cache = lock(&self.cache)?;
        self.evict_inner(&persistor, &mut cache, attr.id())
    }

    fn evict_inner(
        &self,
        persistor: &Persistor,
        cache: &mut SessionCache,
        id: AttrId,
    ) -> Result<()> {
        cache.evict(id);
        if let Some(row) = persistor.get_attribute(id)? {
            match row.kind {
                AttrKind::List => {
                    for (_, child) in persistor.list_entries(id)? {
                        self.evict_inner(persistor, cache, child)?;
                    }
                }
                AttrKind::Map => {
                    for (_, child) in persistor.map_entries(id)? {
                        self.evict_inner(persistor, cache, child)?;
                    }
                }
                _ => (),
            }
        }
        Ok(())
    }

    /// Detaches a single attribute from the session cache, leaving any
    /// cached descendants in place.
    pub fn evict_flat(&self, attr: &StoredAttr) -> Result<()> {
        lock(&self.cache)?.evict(attr.id());
        Ok(())
    }

    pub fn cache_size(&self) -> Result<usize> {
        Ok(lock(&self.cache)?.len())
    }
}

// ------------- Dual-form conversion -------------

impl Attribute {
    /// The value form of this attribute. A value-form instance is returned
    /// unchanged; a stored-form instance is materialized.
    pub fn value_form(&self, store: &AttrStore) -> Result<AttrValue> {
        match self {
            Attribute::Value(value) => Ok(value.clone()),
            Attribute::Stored(stored) => store.materialize(stored),
        }
    }

    /// The stored form of this attribute. A stored-form instance is returned
    /// unchanged; a value-form instance is persisted.
    pub fn stored_form(&self, store: &AttrStore) -> Result<StoredAttr> {
        match self {
            Attribute::Value(value) => store.create(value),
            Attribute::Stored(stored) => Ok(stored.clone()),
        }
    }
}

// ------------- List view -------------

/// Operations on one stored list attribute. Indices are zero-based,
/// contiguous and gap-free; insert and remove renumber the tail to keep
/// them that way.
pub struct StoredList<'a> {
    store: &'a AttrStore,
    attr: StoredAttr,
}

impl StoredList<'_> {
    pub fn id(&self) -> AttrId {
        self.attr.id()
    }

    pub fn len(&self) -> Result<usize> {
        lock(&self.store.persistor)?.list_len(self.attr.id())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn get(&self, index: usize) -> Result<AttrValue> {
        let persistor = lock(&self.store.persistor)?;
        let mut cache = lock(&self.store.cache)?;
        let len = persistor.list_len(self.attr.id())?;
        if index >= len {
            return Err(AttrError::InvalidArgument(format!(
                "index {index} out of range for list of {len}"
            )));
        }
        match persistor.list_get(self.attr.id(), index as i64)? {
            Some(child) => self.store.materialize_inner(&persistor, &mut cache, child),
            None => Err(AttrError::Corruption {
                message: format!("list {} is missing index {index}", self.attr.id()),
            }),
        }
    }

    /// Appends at the current end.
    pub fn push(&self, value: &AttrValue) -> Result<StoredAttr> {
        let persistor = lock(&self.store.persistor)?;
        let len = persistor.list_len(self.attr.id())?;
        let child = self.store.create_inner(&persistor, value, None)?;
        persistor.add_list_entry(self.attr.id(), len as i64, child.id())?;
        persistor.touch_version(self.attr.id())?;
        Ok(child)
    }

    /// Inserts at `index`, shifting every entry at or after it up by one.
    /// The shift walks from the high end down so no re-key collides.
    pub fn insert(&self, index: usize, value: &AttrValue) -> Result<StoredAttr> {
        let persistor = lock(&self.store.persistor)?;
        let len = persistor.list_len(self.attr.id())?;
        if index > len {
            return Err(AttrError::InvalidArgument(format!(
                "index {index} out of range for insert into list of {len}"
            )));
        }
        for i in (index..len).rev() {
            persistor.rekey_list_entry(self.attr.id(), i as i64, i as i64 + 1)?;
        }
        let child = self.store.create_inner(&persistor, value, None)?;
        persistor.add_list_entry(self.attr.id(), index as i64, child.id())?;
        persistor.touch_version(self.attr.id())?;
        Ok(child)
    }

    /// Removes the entry at `index`, recursively deleting the attribute
    /// bound there, then shifts the tail down from the low end up.
    pub fn remove(&self, index: usize) -> Result<()> {
        let persistor = lock(&self.store.persistor)?;
        let mut cache = lock(&self.store.cache)?;
        let len = persistor.list_len(self.attr.id())?;
        if index >= len {
            return Err(AttrError::InvalidArgument(format!(
                "index {index} out of range for list of {len}"
            )));
        }
        let child = persistor
            .list_get(self.attr.id(), index as i64)?
            .ok_or_else(|| AttrError::Corruption {
                message: format!("list {} is missing index {index}", self.attr.id()),
            })?;
        self.store.delete_inner(&persistor, &mut cache, child)?;
        persistor.remove_list_entry(self.attr.id(), index as i64)?;
        for i in index + 1..len {
            persistor.rekey_list_entry(self.attr.id(), i as i64, i as i64 - 1)?;
        }
        persistor.touch_version(self.attr.id())?;
        Ok(())
    }

    /// Replaces the attribute at an existing `index`; the previous one is
    /// recursively deleted.
    pub fn set(&self, index: usize, value: &AttrValue) -> Result<StoredAttr> {
        let persistor = lock(&self.store.persistor)?;
        let mut cache = lock(&self.store.cache)?;
        let len = persistor.list_len(self.attr.id())?;
        if index >= len {
            return Err(AttrError::InvalidArgument(format!(
                "index {index} out of range for list of {len}"
            )));
        }
        let old = persistor
            .list_get(self.attr.id(), index as i64)?
            .ok_or_else(|| AttrError::Corruption {
                message: format!("list {} is missing index {index}", self.attr.id()),
            })?;
        self.store.delete_inner(&persistor, &mut cache, old)?;
        let child = self.store.create_inner(&persistor, value, None)?;
        persistor.set_list_entry(self.attr.id(), index as i64, child.id())?;
        persistor.touch_version(self.attr.id())?;
        Ok(child)
    }

    /// Recursively deletes every entry.
    pub fn clear(&self) -> Result<()> {
        let persistor = lock(&self.store.persistor)?;
        let mut cache = lock(&self.store.cache)?;
        for (_, child) in persistor.list_entries(self.attr.id())? {
            self.store.delete_inner(&persistor, &mut cache, child)?;
        }
        persistor.clear_list(self.attr.id())?;
        persistor.touch_version(self.attr.id())?;
        Ok(())
    }

    /// Materializes the entries in index order. Each call re-queries, so the
    /// iterator restarts from current state.
    pub fn iter(&self) -> Result<std::vec::IntoIter<AttrValue>> {
        let persistor = lock(&self.store.persistor)?;
        let mut cache = lock(&self.store.cache)?;
        let mut items = Vec::new();
        for (_, child) in persistor.list_entries(self.attr.id())? {
            items.push(self.store.materialize_inner(&persistor, &mut cache, child)?);
        }
        Ok(items.into_iter())
    }

    /// The entry wrappers in index order, pairing each structural key with
    /// the handle bound there.
    pub fn entries(&self) -> Result<Vec<ListEntry>> {
        let persistor = lock(&self.store.persistor)?;
        let mut entries = Vec::new();
        for (index, child) in persistor.list_entries(self.attr.id())? {
            let row = persistor
                .get_attribute(child)?
                .ok_or_else(|| AttrError::Corruption {
                    message: format!("list {} references missing attribute {child}", self.attr.id()),
                })?;
            entries.push(ListEntry {
                key: ListEntryKey {
                    list: self.attr.id(),
                    index,
                },
                attr: StoredAttr::new(child, row.version, row.kind, row.acl),
            });
        }
        Ok(entries)
    }
}

// ------------- Map view -------------

/// Operations on one stored map attribute: an unordered collection keyed by
/// strings unique within the map.
pub struct StoredMap<'a> {
    store: &'a AttrStore,
    attr: StoredAttr,
}

impl StoredMap<'_> {
    pub fn id(&self) -> AttrId {
        self.attr.id()
    }

    pub fn len(&self) -> Result<usize> {
        lock(&self.store.persistor)?.map_len(self.attr.id())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn get(&self, key: &str) -> Result<Option<AttrValue>> {
        let persistor = lock(&self.store.persistor)?;
        let mut cache = lock(&self.store.cache)?;
        match persistor.map_get(self.attr.id(), key)? {
            Some(child) => Ok(Some(self.store.materialize_inner(
                &persistor,
                &mut cache,
                child,
            )?)),
            None => Ok(None),
        }
    }

    /// Binds `value` at `key`. An attribute previously bound there is
    /// recursively deleted first.
    pub fn put(&self, key: &str, value: &AttrValue) -> Result<StoredAttr> {
        let persistor = lock(&self.store.persistor)?;
        let mut cache = lock(&self.store.cache)?;
        match persistor.map_get(self.attr.id(), key)? {
            Some(old) => {
                self.store.delete_inner(&persistor, &mut cache, old)?;
                let child = self.store.create_inner(&persistor, value, None)?;
                persistor.set_map_entry(self.attr.id(), key, child.id())?;
                persistor.touch_version(self.attr.id())?;
                Ok(child)
            }
            None => {
                let child = self.store.create_inner(&persistor, value, None)?;
                persistor.add_map_entry(self.attr.id(), key, child.id())?;
                persistor.touch_version(self.attr.id())?;
                Ok(child)
            }
        }
    }

    /// Unbinds `key`, recursively deleting the attribute bound there. The
    /// key must currently be bound.
    pub fn remove(&self, key: &str) -> Result<()> {
        let persistor = lock(&self.store.persistor)?;
        let mut cache = lock(&self.store.cache)?;
        let child = persistor
            .map_get(self.attr.id(), key)?
            .ok_or_else(|| {
                AttrError::InvalidArgument(format!(
                    "key '{key}' is not bound in map {}",
                    self.attr.id()
                ))
            })?;
        self.store.delete_inner(&persistor, &mut cache, child)?;
        persistor.remove_map_entry(self.attr.id(), key)?;
        persistor.touch_version(self.attr.id())?;
        Ok(())
    }

    /// Snapshot of the keys at call time.
    pub fn keys(&self) -> Result<Vec<String>> {
        let persistor = lock(&self.store.persistor)?;
        Ok(persistor
            .map_entries(self.attr.id())?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    /// Snapshot of the materialized values at call time.
    pub fn values(&self) -> Result<Vec<AttrValue>> {
        let persistor = lock(&self.store.persistor)?;
        let mut cache = lock(&self.store.cache)?;
        let mut values = Vec::new();
        for (_, child) in persistor.map_entries(self.attr.id())? {
            values.push(self.store.materialize_inner(&persistor, &mut cache, child)?);
        }
        Ok(values)
    }

    /// Snapshot of the entry wrappers at call time.
    pub fn entry_set(&self) -> Result<Vec<MapEntry>> {
        let persistor = lock(&self.store.persistor)?;
        let mut entries = Vec::new();
        for (key, child) in persistor.map_entries(self.attr.id())? {
            let row = persistor
                .get_attribute(child)?
                .ok_or_else(|| AttrError::Corruption {
                    message: format!("map {} references missing attribute {child}", self.attr.id()),
                })?;
            entries.push(MapEntry {
                key: MapEntryKey {
                    map: self.attr.id(),
                    key,
                },
                attr: StoredAttr::new(child, row.version, row.kind, row.acl),
            });
        }
        Ok(entries)
    }

    /// Recursively deletes every entry.
    pub fn clear(&self) -> Result<()> {
        let persistor = lock(&self.store.persistor)?;
        let mut cache = lock(&self.store.cache)?;
        for (_, child) in persistor.map_entries(self.attr.id())? {
            self.store.delete_inner(&persistor, &mut cache, child)?;
        }
        persistor.clear_map(self.attr.id())?;
        persistor.touch_version(self.attr.id())?;
        Ok(())
    }
}
