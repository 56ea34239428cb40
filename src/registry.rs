use tracing::debug;

use crate::attribute::{AttrValue, StoredAttr};
use crate::error::{AttrError, Result};
use crate::store::{AttrStore, lock};

/// The service-level surface: attribute trees bound under global key tuples
/// of one to three string components. Component tuples are unique; the
/// create path surfaces a violation as a distinguishable duplicate error
/// carrying the offending tuple.
pub struct Registry<'a> {
    store: &'a AttrStore,
}

impl AttrStore {
    pub fn registry(&self) -> Registry<'_> {
        Registry { store: self }
    }
}

fn normalize(key: &[&str]) -> Result<[String; 3]> {
    if key.is_empty() || key.len() > 3 {
        return Err(AttrError::InvalidArgument(format!(
            "a registry key has one to three components, got {}",
            key.len()
        )));
    }
    if key.iter().any(|component| component.is_empty()) {
        return Err(AttrError::InvalidArgument(
            "registry key components must be non-empty".to_owned(),
        ));
    }
    let mut normalized = [String::new(), String::new(), String::new()];
    for (position, component) in key.iter().enumerate() {
        normalized[position] = (*component).to_owned();
    }
    Ok(normalized)
}

fn render(key: &[&str]) -> String {
    key.join("/")
}

impl Registry<'_> {
    pub fn exists(&self, key: &[&str]) -> Result<bool> {
        let normalized = normalize(key)?;
        let persistor = lock(&self.store.persistor)?;
        Ok(persistor.get_global_entry(&normalized)?.is_some())
    }

    /// The stored handle bound under `key`, for callers that want to keep
    /// working on the tree (e.g. through a list or map view).
    pub fn load(&self, key: &[&str]) -> Result<Option<StoredAttr>> {
        let normalized = normalize(key)?;
        let id = {
            let persistor = lock(&self.store.persistor)?;
            persistor.get_global_entry(&normalized)?
        };
        match id {
            Some(id) => Ok(Some(self.store.load(id)?)),
            None => Ok(None),
        }
    }

    /// The materialized value bound under `key`, or None.
    pub fn get(&self, key: &[&str]) -> Result<Option<AttrValue>> {
        let normalized = normalize(key)?;
        let persistor = lock(&self.store.persistor)?;
        let mut cache = lock(&self.store.cache)?;
        match persistor.get_global_entry(&normalized)? {
            Some(id) => Ok(Some(self.store.materialize_inner(
                &persistor,
                &mut cache,
                id,
            )?)),
            None => Ok(None),
        }
    }

    /// Binds a fresh attribute tree under `key`; the key must not already
    /// be bound.
    pub fn create(&self, key: &[&str], value: &AttrValue) -> Result<StoredAttr> {
        let normalized = normalize(key)?;
        let persistor = lock(&self.store.persistor)?;
        let stored = self.store.create_inner(&persistor, value, None)?;
        match persistor.add_global_entry(&normalized, stored.id()) {
            Ok(()) => {
                debug!(key = %render(key), id = stored.id(), "registry create");
                Ok(stored)
            }
            Err(AttrError::Duplicate(_)) => {
                // roll the orphaned tree back before surfacing the clash
                let mut cache = lock(&self.store.cache)?;
                self.store.delete_inner(&persistor, &mut cache, stored.id())?;
                lock(&self.store.id_generator)?.release(stored.id());
                Err(AttrError::Duplicate(render(key)))
            }
            Err(e) => Err(e),
        }
    }

    /// Binds a fresh attribute tree under `key`, replacing (and recursively
    /// deleting) whatever was bound there before.
    pub fn set(&self, key: &[&str], value: &AttrValue) -> Result<StoredAttr> {
        let normalized = normalize(key)?;
        let persistor = lock(&self.store.persistor)?;
        let mut cache = lock(&self.store.cache)?;
        let stored = self.store.create_inner(&persistor, value, None)?;
        match persistor.get_global_entry(&normalized)? {
            Some(old) => {
                self.store.delete_inner(&persistor, &mut cache, old)?;
                persistor.set_global_entry(&normalized, stored.id())?;
            }
            None => {
                persistor.add_global_entry(&normalized, stored.id())?;
            }
        }
        debug!(key = %render(key), id = stored.id(), "registry set");
        Ok(stored)
    }

    /// Unbinds `key` and recursively deletes the attribute tree. Returns
    /// whether anything was bound.
    pub fn remove(&self, key: &[&str]) -> Result<bool> {
        let normalized = normalize(key)?;
        let persistor = lock(&self.store.persistor)?;
        let mut cache = lock(&self.store.cache)?;
        match persistor.get_global_entry(&normalized)? {
            Some(id) => {
                self.store.delete_inner(&persistor, &mut cache, id)?;
                persistor.remove_global_entry(&normalized)?;
                debug!(key = %render(key), id, "registry remove");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// How many key tuples are bound.
    pub fn len(&self) -> Result<usize> {
        let persistor = lock(&self.store.persistor)?;
        persistor.global_count()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
