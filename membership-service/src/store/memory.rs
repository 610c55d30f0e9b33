//! In-memory document store.
//!
//! Transactions hold a store-wide async mutex for their whole lifetime and
//! buffer writes locally; commit applies the buffer under one write lock.
//! Concurrent transactions therefore serialize, and plain readers never
//! observe a partially applied commit.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Collection, DocRef, DocumentStore, StoreError, StoreTransaction};

type DocMap = HashMap<DocRef, Value>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Arc<RwLock<DocMap>>,
    txn_gate: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document directly, bypassing transactions. Test setup only.
    pub fn seed(&self, doc: DocRef, data: Value) {
        if let Ok(mut docs) = self.docs.write() {
            docs.insert(doc, data);
        }
    }

    /// Read a document directly. Test inspection only.
    pub fn document(&self, doc: &DocRef) -> Option<Value> {
        self.docs.read().ok().and_then(|docs| docs.get(doc).cloned())
    }

    /// Ids currently present in `collection`, in no particular order.
    pub fn ids_in(&self, collection: Collection) -> Vec<String> {
        self.docs
            .read()
            .map(|docs| {
                docs.keys()
                    .filter(|doc| doc.collection == collection)
                    .map(|doc| doc.id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of documents in `collection`.
    pub fn count(&self, collection: Collection) -> usize {
        self.docs
            .read()
            .map(|docs| {
                docs.keys()
                    .filter(|doc| doc.collection == collection)
                    .count()
            })
            .unwrap_or(0)
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("store lock poisoned".to_string())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, doc: &DocRef) -> Result<Option<Value>, StoreError> {
        let docs = self.docs.read().map_err(|_| poisoned())?;
        Ok(docs.get(doc).cloned())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let permit = Arc::clone(&self.txn_gate).lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            docs: Arc::clone(&self.docs),
            staged: Vec::new(),
            _permit: permit,
        }))
    }
}

enum StagedWrite {
    Set(DocRef, Value),
    Update(DocRef, Value),
}

struct MemoryTransaction {
    docs: Arc<RwLock<DocMap>>,
    staged: Vec<StagedWrite>,
    _permit: OwnedMutexGuard<()>,
}

/// Top-level field merge; explicit nulls overwrite like any other value.
fn merge_fields(base: &mut Value, partial: &Value) {
    if let (Value::Object(base), Value::Object(partial)) = (base, partial) {
        for (key, value) in partial {
            base.insert(key.clone(), value.clone());
        }
    }
}

impl MemoryTransaction {
    /// Fold this transaction's staged writes for `doc` over the base value.
    fn effective(&self, doc: &DocRef, base: Option<Value>) -> Option<Value> {
        let mut current = base;
        for write in &self.staged {
            match write {
                StagedWrite::Set(target, data) if target == doc => {
                    current = Some(data.clone());
                }
                StagedWrite::Update(target, partial) if target == doc => {
                    if let Some(existing) = current.as_mut() {
                        merge_fields(existing, partial);
                    }
                }
                _ => {}
            }
        }
        current
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn get(&mut self, doc: &DocRef) -> Result<Option<Value>, StoreError> {
        let base = {
            let docs = self.docs.read().map_err(|_| poisoned())?;
            docs.get(doc).cloned()
        };
        Ok(self.effective(doc, base))
    }

    fn set(&mut self, doc: &DocRef, data: Value) {
        self.staged.push(StagedWrite::Set(doc.clone(), data));
    }

    fn update(&mut self, doc: &DocRef, partial: Value) {
        self.staged.push(StagedWrite::Update(doc.clone(), partial));
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction {
            docs,
            staged,
            _permit,
        } = *self;

        let mut map = docs.write().map_err(|_| poisoned())?;

        // Validate before applying anything, so a bad update cannot leave a
        // half-applied buffer behind.
        {
            let mut will_exist: HashMap<&DocRef, bool> = HashMap::new();
            for write in &staged {
                match write {
                    StagedWrite::Set(doc, _) => {
                        will_exist.insert(doc, true);
                    }
                    StagedWrite::Update(doc, _) => {
                        let exists = will_exist
                            .get(doc)
                            .copied()
                            .unwrap_or_else(|| map.contains_key(doc));
                        if !exists {
                            return Err(StoreError::MissingDocument {
                                collection: doc.collection.name(),
                                id: doc.id.clone(),
                            });
                        }
                    }
                }
            }
        }

        for write in staged {
            match write {
                StagedWrite::Set(doc, data) => {
                    map.insert(doc, data);
                }
                StagedWrite::Update(doc, partial) => {
                    if let Some(existing) = map.get_mut(&doc) {
                        merge_fields(existing, &partial);
                    }
                }
            }
        }

        Ok(())
    }
}
