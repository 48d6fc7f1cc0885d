use super::text::{self, TextIndex, TextQuery};
use super::{Document, DOCUMENT_ID};
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Documents of one collection plus its text index.
///
/// Documents are keyed by id and stored without the `_id` key; it is put
/// back on the way out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default)]
    documents: BTreeMap<String, Document>,
    #[serde(default)]
    text_index: Option<TextIndex>,
}

impl Collection {
    pub fn insert(&mut self, mut doc: Document) -> Result<String, StoreError> {
        let id = match doc.remove(DOCUMENT_ID) {
            Some(id) => id,
            None => Uuid::new_v4().simple().to_string(),
        };
        if self.documents.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }
        self.documents.insert(id.clone(), doc);
        Ok(id)
    }

    pub fn find(&self, id: &str) -> Option<Document> {
        self.documents.get(id).map(|doc| with_id(id, doc))
    }

    pub fn all(&self) -> Vec<Document> {
        self.documents
            .iter()
            .map(|(id, doc)| with_id(id, doc))
            .collect()
    }

    /// Replaces the document under `id`, returning how many matched.
    pub fn replace(&mut self, id: &str, mut doc: Document) -> u64 {
        doc.remove(DOCUMENT_ID);
        match self.documents.get_mut(id) {
            Some(existing) => {
                *existing = doc;
                1
            }
            None => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn text_index(&self) -> Option<&TextIndex> {
        self.text_index.as_ref()
    }

    pub fn create_text_index(
        &mut self,
        fields: &BTreeSet<String>,
    ) -> Result<TextIndex, StoreError> {
        if let Some(existing) = &self.text_index {
            return Err(StoreError::IndexExists(existing.name.clone()));
        }
        let index = TextIndex::new(fields.clone());
        self.text_index = Some(index.clone());
        Ok(index)
    }

    pub fn drop_index(&mut self, name: &str) -> Result<(), StoreError> {
        match &self.text_index {
            Some(index) if index.name == name => {
                self.text_index = None;
                Ok(())
            }
            _ => Err(StoreError::IndexNotFound(name.to_string())),
        }
    }

    pub fn search(&self, collection: &str, query: &str) -> Result<Vec<Document>, StoreError> {
        let index = self
            .text_index
            .as_ref()
            .ok_or_else(|| StoreError::NoTextIndex(collection.to_string()))?;
        let docs = self.all();
        Ok(text::search(index, &docs, &TextQuery::parse(query)))
    }
}

fn with_id(id: &str, doc: &Document) -> Document {
    let mut out = doc.clone();
    out.insert(DOCUMENT_ID.to_string(), id.to_string());
    out
}
