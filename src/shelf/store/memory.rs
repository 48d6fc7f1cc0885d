use super::collection::Collection;
use super::{Document, DocumentStore, StoreResult, TextIndex};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};

/// In-memory document store for testing and development.
/// Does NOT persist data.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection (0 if it does not exist).
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, Collection::len)
    }

    fn read<T>(&self, collection: &str, f: impl FnOnce(&Collection) -> T) -> T {
        let collections = self.collections.read();
        match collections.get(collection) {
            Some(col) => f(col),
            None => f(&Collection::default()),
        }
    }

    fn write<T>(&self, collection: &str, f: impl FnOnce(&mut Collection) -> T) -> T {
        let mut collections = self.collections.write();
        f(collections.entry(collection.to_string()).or_default())
    }
}

impl DocumentStore for InMemoryStore {
    fn insert_one(&self, collection: &str, doc: Document) -> StoreResult<String> {
        self.write(collection, |col| col.insert(doc))
    }

    fn find_one(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        Ok(self.read(collection, |col| col.find(id)))
    }

    fn find_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        Ok(self.read(collection, Collection::all))
    }

    fn replace_one(&self, collection: &str, id: &str, doc: Document) -> StoreResult<u64> {
        Ok(self.write(collection, |col| col.replace(id, doc)))
    }

    fn text_search(&self, collection: &str, query: &str) -> StoreResult<Vec<Document>> {
        self.read(collection, |col| col.search(collection, query))
    }

    fn text_index(&self, collection: &str) -> StoreResult<Option<TextIndex>> {
        Ok(self.read(collection, |col| col.text_index().cloned()))
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
        Ok(())
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::config::ShelfConfig;
    use crate::store::RecordStore;
    use crate::RecordService;
    use std::sync::Arc;

    /// A record service over an in-memory store with the default formats
    /// and a handful of authors and books.
    pub struct ServiceFixture {
        pub backend: Arc<InMemoryStore>,
        pub service: RecordService,
        pub authors: Vec<String>,
        pub books: Vec<String>,
    }

    impl Default for ServiceFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ServiceFixture {
        /// Formats only, no records.
        pub fn empty() -> Self {
            let registry = ShelfConfig::default()
                .build_registry()
                .expect("default formats are valid");
            let backend = Arc::new(InMemoryStore::new());
            let mut store = RecordStore::new(backend.clone());
            store
                .initialize_indexes(&registry)
                .expect("memory store cannot fail");
            Self {
                backend,
                service: RecordService::new(Arc::new(registry), store),
                authors: Vec::new(),
                books: Vec::new(),
            }
        }

        pub fn new() -> Self {
            let mut fixture = Self::empty();
            for (name, birthdate, biography) in [
                ("Haruki Murakami", "1949", "Japanese"),
                ("George Orwell", "1903", "English"),
            ] {
                let id = fixture.add(
                    "author",
                    &[("name", name), ("birthdate", birthdate), ("biography", biography)],
                );
                fixture.authors.push(id);
            }
            let murakami = fixture.authors[0].clone();
            let orwell = fixture.authors[1].clone();
            for (name, year, author, synopsis) in [
                ("Norwegian Wood", "1987", murakami.as_str(), "novel"),
                ("Kafka On The Shore", "2002", murakami.as_str(), "novel"),
                ("Animal Farm", "1945", orwell.as_str(), "fable"),
            ] {
                let id = fixture.add(
                    "book",
                    &[("name", name), ("year", year), ("author", author), ("synopsis", synopsis)],
                );
                fixture.books.push(id);
            }
            fixture
        }

        fn add(&self, format: &str, pairs: &[(&str, &str)]) -> String {
            let fields = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            self.service
                .add_record(format, fields)
                .expect("fixture records are valid")
        }
    }
}
