//! Fakes shared by the unit tests of several subsystems.

use crate::error::{Error, Result};
use crate::harvest::producer::RecordConsumer;
use crate::harvest::source::{Content, ContentSource};
use crate::record::Record;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// Logs every call as `add:<id>` or `delete:<id>`, optionally failing on one id.
pub struct RecordingConsumer {
    name: String,
    fail_on: Option<String>,
    pub events: Mutex<Vec<String>>,
}

impl RecordingConsumer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail_on: None,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(name: &str, id: &str) -> Self {
        Self {
            fail_on: Some(id.to_string()),
            ..Self::new(name)
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn log(&self, event: String, id: &str) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event);
        if self.fail_on.as_deref() == Some(id) {
            return Err(anyhow::anyhow!("refusing {}", id));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordConsumer for RecordingConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn add(&self, record: &Record) -> anyhow::Result<()> {
        self.log(format!("add:{}", record.id()), record.id())
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        self.log(format!("delete:{}", id), id)
    }
}

/// Serves canned content keyed by URI and counts reads.
#[derive(Default)]
pub struct FakeSource {
    content: HashMap<String, Content>,
    pub reads: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(mut self, uri: &str, body: impl Into<String>) -> Self {
        self.content
            .insert(uri.to_string(), Content::Document(body.into()));
        self
    }

    pub fn collection(mut self, uri: &str, children: &[&str]) -> Self {
        let children = children
            .iter()
            .map(|child| Url::parse(child).unwrap())
            .collect();
        self.content
            .insert(uri.to_string(), Content::Collection(children));
        self
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn read(&self, uri: &Url) -> Result<Content> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.content
            .get(uri.as_str())
            .cloned()
            .ok_or_else(|| Error::transport(uri.as_str(), "connection refused"))
    }
}

/// A `ListRecords` page; each item is `(identifier, deleted, title)`.
pub fn oai_page(items: &[(&str, bool, &str)], token: Option<&str>) -> String {
    let mut body = String::from(
        "<?xml version=\"1.0\"?>\n<OAI-PMH xmlns=\"http://www.openarchives.org/OAI/2.0/\">\n<ListRecords>\n",
    );
    for (id, deleted, title) in items {
        if *deleted {
            body.push_str(&format!(
                "<record><header status=\"deleted\"><identifier>{}</identifier><datestamp>2010-01-01</datestamp></header></record>\n",
                id
            ));
        } else {
            body.push_str(&format!(
                "<record><header><identifier>{}</identifier><datestamp>2010-01-01</datestamp></header>\
                 <metadata><DIF><Entry_Title>{}</Entry_Title><dc:subject>climate</dc:subject></DIF></metadata></record>\n",
                id, title
            ));
        }
    }
    if let Some(token) = token {
        body.push_str(&format!("<resumptionToken>{}</resumptionToken>\n", token));
    }
    body.push_str("</ListRecords>\n</OAI-PMH>\n");
    body
}
