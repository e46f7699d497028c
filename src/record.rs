//! The canonical unit of harvested and searchable metadata.

use serde::{Deserialize, Serialize};

/// One harvested metadata item: a fixed identifier plus an ordered bag of
/// multi-valued fields.
///
/// Field order is the order in which fields were first added, and values within a
/// field keep their insertion order. A record flagged `deleted` represents a
/// withdrawal signaled by the repository and is routed to consumers' delete path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    id: String,
    fields: Vec<(String, Vec<String>)>,
    #[serde(default)]
    deleted: bool,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
            deleted: false,
        }
    }

    /// A tombstone for an item the repository reports as no longer existing.
    pub fn deletion(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
            deleted: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Appends a value to a field, creating the field on first use.
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, values)) => values.push(value),
            None => self.fields.push((name, vec![value])),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_field(name, value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.field(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// JSON document in the shape the index backend's update endpoint accepts:
    /// `id` plus one array per field.
    pub fn to_index_document(&self) -> serde_json::Value {
        let mut doc = serde_json::Map::new();
        doc.insert("id".to_string(), serde_json::Value::from(self.id.clone()));
        for (name, values) in &self.fields {
            if name == "id" {
                continue;
            }
            doc.insert(name.clone(), serde_json::Value::from(values.clone()));
        }
        serde_json::Value::Object(doc)
    }
}
