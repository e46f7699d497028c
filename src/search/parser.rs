//! Backend Response Parsers
//!
//! Both wire formats carry the same logical result: the match count, the page of
//! documents and facet counts. Markup responses are scanned with regular
//! expressions for the standard `<result>`, `<doc>` and `facet_fields` elements.

use super::types::{ReturnFormat, SearchOutput};
use crate::error::{Error, Result};
use crate::record::Record;

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static RESULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<result\b([^>]*?)(?:/>|>(.*?)</result>)"#).expect("valid regex")
});
static NUM_FOUND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"numFound\s*=\s*"(\d+)""#).expect("valid regex"));
static START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bstart\s*=\s*"(\d+)""#).expect("valid regex"));
static DOC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<doc>(.*?)</doc>").expect("valid regex"));
static DOC_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<arr name="([^"]+)">(.*?)</arr>|<(\w+) name="([^"]+)">([^<]*)</\w+>"#)
        .expect("valid regex")
});
static ARR_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\w+>([^<]*)</\w+>").expect("valid regex"));
static FACET_FIELDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<lst name="facet_fields">"#).expect("valid regex"));
static FACET_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\A\s*(?:<lst name="([^"]+)"\s*/>|<lst name="([^"]+)">(.*?)</lst>)"#)
        .expect("valid regex")
});
static FACET_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<int name="([^"]*)">(\d+)</int>"#).expect("valid regex"));

pub fn parse(body: &str, format: ReturnFormat) -> Result<SearchOutput> {
    match format {
        ReturnFormat::Xml => parse_xml(body),
        ReturnFormat::Json => parse_json(body),
    }
}

pub fn parse_xml(body: &str) -> Result<SearchOutput> {
    if !body.contains("<response") {
        return Err(Error::parse("missing <response> element"));
    }
    let result = RESULT
        .captures(body)
        .ok_or_else(|| Error::parse("missing <result> element"))?;

    let attrs = &result[1];
    let mut output = SearchOutput {
        count: attribute(&NUM_FOUND, attrs)?,
        offset: attribute(&START, attrs)?,
        ..Default::default()
    };

    if let Some(docs) = result.get(2) {
        for doc in DOC.captures_iter(docs.as_str()) {
            let mut fields = Vec::new();
            for field in DOC_FIELD.captures_iter(&doc[1]) {
                if let (Some(name), Some(values)) = (field.get(1), field.get(2)) {
                    for value in ARR_VALUE.captures_iter(values.as_str()) {
                        fields.push((name.as_str().to_string(), unescape(&value[1])));
                    }
                } else if let (Some(name), Some(value)) = (field.get(4), field.get(5)) {
                    fields.push((name.as_str().to_string(), unescape(value.as_str())));
                }
            }
            if let Some(record) = to_record(fields) {
                output.records.push(record);
            }
        }
    }

    if let Some(section) = FACET_FIELDS.find(body) {
        let mut rest = &body[section.end()..];
        while let Some(facet) = FACET_FIELD.captures(rest) {
            if let Some(name) = facet.get(2) {
                let counts = FACET_COUNT
                    .captures_iter(facet.get(3).map_or("", |m| m.as_str()))
                    .filter_map(|c| Some((unescape(&c[1]), c[2].parse().ok()?)))
                    .collect();
                output.facets.insert(unescape(name.as_str()), counts);
            } else if let Some(name) = facet.get(1) {
                output.facets.insert(unescape(name.as_str()), Vec::new());
            }
            rest = &rest[facet.get(0).map_or(rest.len(), |m| m.end())..];
        }
    }

    Ok(output)
}

pub fn parse_json(body: &str) -> Result<SearchOutput> {
    let root: Value = serde_json::from_str(body).map_err(Error::parse)?;
    let response = root
        .get("response")
        .ok_or_else(|| Error::parse("missing 'response' object"))?;

    let mut output = SearchOutput {
        count: response
            .get("numFound")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::parse("missing numFound"))?,
        offset: response.get("start").and_then(Value::as_u64).unwrap_or(0),
        ..Default::default()
    };

    for doc in response
        .get("docs")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let Some(object) = doc.as_object() else {
            continue;
        };
        let mut fields = Vec::new();
        for (name, value) in object {
            match value {
                Value::Array(values) => {
                    fields.extend(values.iter().map(|v| (name.clone(), json_text(v))))
                }
                other => fields.push((name.clone(), json_text(other))),
            }
        }
        if let Some(record) = to_record(fields) {
            output.records.push(record);
        }
    }

    if let Some(facets) = root
        .pointer("/facet_counts/facet_fields")
        .and_then(Value::as_object)
    {
        for (name, flat) in facets {
            // [value, count, value, count, ...]
            let counts = flat
                .as_array()
                .map(|flat| {
                    flat.chunks(2)
                        .filter_map(|pair| match pair {
                            [value, count] => Some((json_text(value), count.as_u64()?)),
                            _ => None,
                        })
                        .collect()
                })
                .unwrap_or_default();
            output.facets.insert(name.clone(), counts);
        }
    }

    Ok(output)
}

fn attribute(pattern: &Regex, attrs: &str) -> Result<u64> {
    match pattern.captures(attrs) {
        Some(cap) => cap[1].parse().map_err(Error::parse),
        None => Ok(0),
    }
}

/// Documents without an `id` cannot be represented as records and are dropped.
fn to_record(fields: Vec<(String, String)>) -> Option<Record> {
    let id = fields
        .iter()
        .find(|(name, _)| name == "id")
        .map(|(_, value)| value.clone());
    let Some(id) = id else {
        tracing::debug!("Dropping result document without id");
        return None;
    };

    let mut record = Record::new(id);
    for (name, value) in fields {
        if name != "id" {
            record.add_field(name, value);
        }
    }
    Some(record)
}

fn json_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
