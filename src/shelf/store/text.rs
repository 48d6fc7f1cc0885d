//! Text indexes and text search.
//!
//! Both backends search the same way: the query is split into lowercase
//! terms, `-term` excludes documents, and a document matches when at least
//! one positive term appears as a word in one of the indexed fields.

use super::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Definition of a collection's text index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextIndex {
    pub name: String,
    pub fields: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl TextIndex {
    pub fn new(fields: BTreeSet<String>) -> Self {
        Self {
            name: index_name(&fields),
            fields,
            created_at: Utc::now(),
        }
    }

    /// Scores a document against the query, or `None` if it does not match.
    pub fn score(&self, doc: &Document, query: &TextQuery) -> Option<usize> {
        let mut hits = 0;
        for field in &self.fields {
            let Some(value) = doc.get(field) else {
                continue;
            };
            for word in words(value) {
                if query.excluded.contains(&word) {
                    return None;
                }
                if query.terms.contains(&word) {
                    hits += 1;
                }
            }
        }
        (hits > 0).then_some(hits)
    }
}

/// Index names follow the `<field>_text` convention joined by underscores.
pub fn index_name(fields: &BTreeSet<String>) -> String {
    if fields.is_empty() {
        return "text".to_string();
    }
    fields
        .iter()
        .map(|f| format!("{}_text", f))
        .collect::<Vec<_>>()
        .join("_")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextQuery {
    pub terms: BTreeSet<String>,
    pub excluded: BTreeSet<String>,
}

impl TextQuery {
    pub fn parse(query: &str) -> Self {
        let mut parsed = TextQuery::default();
        for raw in query.split_whitespace() {
            match raw.strip_prefix('-') {
                Some(rest) if !rest.is_empty() => parsed.excluded.extend(words(rest)),
                _ => parsed.terms.extend(words(raw)),
            }
        }
        parsed
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Lowercase alphanumeric runs of `text`.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Runs a query over `docs`, best matches first, ties broken by id.
pub fn search<'a, I>(index: &TextIndex, docs: I, query: &TextQuery) -> Vec<Document>
where
    I: IntoIterator<Item = &'a Document>,
{
    if query.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<(usize, &Document)> = docs
        .into_iter()
        .filter_map(|doc| index.score(doc, query).map(|s| (s, doc)))
        .collect();
    scored.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .cmp(score_a)
            .then_with(|| a.get(super::DOCUMENT_ID).cmp(&b.get(super::DOCUMENT_ID)))
    });
    scored.into_iter().map(|(_, doc)| doc.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, pairs: &[(&str, &str)]) -> Document {
        let mut d: Document = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        d.insert(super::super::DOCUMENT_ID.to_string(), id.to_string());
        d
    }

    fn index(fields: &[&str]) -> TextIndex {
        TextIndex::new(fields.iter().map(|f| f.to_string()).collect())
    }

    #[test]
    fn index_name_lists_fields() {
        assert_eq!(index(&["name", "biography"]).name, "biography_text_name_text");
    }

    #[test]
    fn parse_splits_terms_and_exclusions() {
        let q = TextQuery::parse("Orwell  -farm Wind-Up");
        assert_eq!(
            q.terms,
            BTreeSet::from(["orwell".to_string(), "wind".to_string(), "up".to_string()])
        );
        assert_eq!(q.excluded, BTreeSet::from(["farm".to_string()]));
    }

    #[test]
    fn lone_dash_is_not_an_exclusion() {
        let q = TextQuery::parse("-");
        assert!(q.is_empty());
        assert!(q.excluded.is_empty());
    }

    #[test]
    fn matches_whole_words_case_insensitively() {
        let idx = index(&["name"]);
        let d = doc("1", &[("name", "George Orwell")]);
        assert_eq!(idx.score(&d, &TextQuery::parse("orwell")), Some(1));
        assert_eq!(idx.score(&d, &TextQuery::parse("orw")), None);
    }

    #[test]
    fn ignores_fields_outside_the_index() {
        let idx = index(&["name"]);
        let d = doc("1", &[("name", "Animal Farm"), ("synopsis", "fable")]);
        assert_eq!(idx.score(&d, &TextQuery::parse("fable")), None);
    }

    #[test]
    fn exclusion_wins_over_matches() {
        let idx = index(&["name", "synopsis"]);
        let d = doc("1", &[("name", "Animal Farm"), ("synopsis", "fable")]);
        assert_eq!(idx.score(&d, &TextQuery::parse("animal -fable")), None);
    }

    #[test]
    fn search_orders_by_score_then_id() {
        let idx = index(&["name", "synopsis"]);
        let docs = vec![
            doc("b", &[("name", "Norwegian Wood"), ("synopsis", "novel")]),
            doc("a", &[("name", "Kafka On The Shore"), ("synopsis", "novel")]),
            doc("c", &[("name", "Novel Novel"), ("synopsis", "novel")]),
            doc("d", &[("name", "Animal Farm"), ("synopsis", "fable")]),
        ];
        let found = search(&idx, &docs, &TextQuery::parse("novel"));
        let ids: Vec<_> = found.iter().map(|d| d["_id"].as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn empty_query_finds_nothing() {
        let idx = index(&["name"]);
        let docs = vec![doc("1", &[("name", "x")])];
        assert!(search(&idx, &docs, &TextQuery::parse("  ")).is_empty());
    }
}
