//! Shared entity store.
//!
//! The store is the only state mutated by more than one crawl handler at a
//! time. Every access goes through a single `RwLock`; callers snapshot what
//! they need and release the lock before doing any network I/O.

use super::{EntityId, EntityRecord};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

/// Create/update/snapshot access to entity records.
///
/// Implementations must make record construction atomic with insertion so no
/// reader ever observes a half-built record.
pub trait EntityStore: Send + Sync {
    /// Allocate the next sequential id and insert a new record under it.
    fn create(&self, name: String, source_page_url: String) -> EntityId;

    /// Apply `mutate` to the record with `id`. Returns `false` (and logs) when
    /// the id is unknown.
    fn update(&self, id: EntityId, mutate: &mut dyn FnMut(&mut EntityRecord)) -> bool;

    /// Copy of every record, ordered by id.
    fn snapshot(&self) -> Vec<EntityRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set the redirect URL if it is still empty. Returns whether it was set.
    fn set_redirect_url(&self, id: EntityId, url: String) -> bool {
        let mut applied = false;
        self.update(id, &mut |record: &mut EntityRecord| {
            if record.redirect_url.is_none() {
                record.redirect_url = Some(url.clone());
                applied = true;
            }
        });
        applied
    }

    /// Set the asset URL if it is still empty and a redirect URL exists.
    fn set_asset_url(&self, id: EntityId, url: String) -> bool {
        let mut applied = false;
        self.update(id, &mut |record: &mut EntityRecord| {
            if record.redirect_url.is_some() && record.asset_url.is_none() {
                record.asset_url = Some(url.clone());
                applied = true;
            }
        });
        applied
    }
}

#[derive(Default)]
struct Inner {
    last_id: u32,
    records: BTreeMap<EntityId, EntityRecord>,
}

/// [`EntityStore`] guarded by one reader/writer lock.
#[derive(Default)]
pub struct LockedStore {
    inner: RwLock<Inner>,
}

impl LockedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for LockedStore {
    fn create(&self, name: String, source_page_url: String) -> EntityId {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.last_id += 1;
        let id = EntityId(inner.last_id);
        debug!(%id, %name, "entity discovered");
        inner
            .records
            .insert(id, EntityRecord::new(id, name, source_page_url));
        id
    }

    fn update(&self, id: EntityId, mutate: &mut dyn FnMut(&mut EntityRecord)) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match inner.records.get_mut(&id) {
            Some(record) => {
                mutate(record);
                true
            }
            None => {
                warn!(%id, "update for unknown entity ignored");
                false
            }
        }
    }

    fn snapshot(&self) -> Vec<EntityRecord> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.records.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }
}
