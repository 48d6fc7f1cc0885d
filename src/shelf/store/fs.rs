use super::collection::Collection;
use super::{Document, DocumentStore, StoreResult, TextIndex};
use crate::error::StoreError;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const COLLECTION_EXT: &str = "json";

/// File-backed document store: one JSON file per collection.
///
/// Collections are loaded on first use and kept in memory; every write
/// rewrites the collection file (temp file + rename).
pub struct FileStore {
    root: PathBuf,
    cache: RwLock<HashMap<String, Collection>>,
}

impl FileStore {
    /// Opens (creating if needed) the data directory.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root)?;
        }
        Ok(Self {
            root,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, name: &str) -> StoreResult<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidCollection(name.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", name, COLLECTION_EXT)))
    }

    fn load(&self, name: &str) -> StoreResult<Collection> {
        let path = self.collection_path(name)?;
        if !path.exists() {
            return Ok(Collection::default());
        }
        let content = fs::read_to_string(&path)?;
        let collection = serde_json::from_str(&content)?;
        debug!(path = %path.display(), "loaded collection");
        Ok(collection)
    }

    fn save(&self, name: &str, collection: &Collection) -> StoreResult<()> {
        let path = self.collection_path(name)?;
        let tmp = path.with_extension(format!("{}.tmp", COLLECTION_EXT));
        let content = serde_json::to_string_pretty(collection)?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn read<T>(&self, name: &str, f: impl FnOnce(&Collection) -> T) -> StoreResult<T> {
        if let Some(collection) = self.cache.read().get(name) {
            return Ok(f(collection));
        }
        let mut cache = self.cache.write();
        if !cache.contains_key(name) {
            let loaded = self.load(name)?;
            cache.insert(name.to_string(), loaded);
        }
        Ok(f(&cache[name]))
    }

    fn write<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Collection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut cache = self.cache.write();
        if !cache.contains_key(name) {
            let loaded = self.load(name)?;
            cache.insert(name.to_string(), loaded);
        }
        let collection = cache
            .get_mut(name)
            .ok_or_else(|| StoreError::InvalidCollection(name.to_string()))?;
        let mut updated = collection.clone();
        let result = f(&mut updated)?;
        self.save(name, &updated)?;
        *collection = updated;
        Ok(result)
    }
}

impl DocumentStore for FileStore {
    fn insert_one(&self, collection: &str, doc: Document) -> StoreResult<String> {
        self.write(collection, |col| col.insert(doc))
    }

    fn find_one(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.read(collection, |col| col.find(id))
    }

    fn find_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        self.read(collection, Collection::all)
    }

    fn replace_one(&self, collection: &str, id: &str, doc: Document) -> StoreResult<u64> {
        self.write(collection, |col| Ok(col.replace(id, doc)))
    }

    fn text_search(&self, collection: &str, query: &str) -> StoreResult<Vec<Document>> {
        self.read(collection, |col| col.search(collection, query))?
    }

    fn text_index(&self, collection: &str) -> StoreResult<Option<TextIndex>> {
        self.read(collection, |col| col.text_index().cloned())
    }

    fn create_text_index(
        &self,
        collection: &str,
        fields: &BTreeSet<String>,
    ) -> StoreResult<TextIndex> {
        self.write(collection, |col| col.create_text_index(fields))
    }

    fn drop_index(&self, collection: &str, name: &str) -> StoreResult<()> {
        self.write(collection, |col| col.drop_index(name))
    }

    fn close(&self) -> StoreResult<()> {
        let mut cache = self.cache.write();
        for (name, collection) in cache.iter() {
            self.save(name, collection)?;
        }
        cache.clear();
        Ok(())
    }
}
