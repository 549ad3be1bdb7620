//! Record extraction from API response pages
//!
//! Responses look like:
//!
//! ```xml
//! <response>
//!   <header>...</header>
//!   <body>
//!     <items>
//!       <item><거래금액>   82,500</거래금액><법정동>사직동</법정동>...</item>
//!     </items>
//!     <numOfRows>10</numOfRows>
//!     <pageNo>1</pageNo>
//!     <totalCount>25</totalCount>
//!   </body>
//! </response>
//! ```
//!
//! The root element's name is not checked. One streaming pass over the
//! document collects `body/totalCount` and the children of every
//! `body/items/*` element; values are kept verbatim apart from the
//! per-field [`Cleanup`](crate::schema::Cleanup).

use crate::error::{EtlError, Result};
use crate::record::Record;
use crate::schema::FieldSchema;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

const BODY_DEPTH: usize = 2;
const TOTAL_COUNT_DEPTH: usize = 3;
const ITEMS_DEPTH: usize = 3;
const ITEM_DEPTH: usize = 4;
const FIELD_DEPTH: usize = 5;

type Item = HashMap<String, String>;

/// Parts of a response page the job reads
#[derive(Debug, Default)]
struct PageDocument {
    has_body: bool,
    total_count: Option<String>,
    items: Option<Vec<Item>>,
}

/// Read `body/totalCount` from a response page
pub fn parse_total_count(xml: &str) -> Result<u64> {
    let doc = parse_document(xml)?;
    if !doc.has_body {
        return Err(EtlError::parse("response has no <body> element"));
    }

    let raw = doc
        .total_count
        .ok_or_else(|| EtlError::parse("response body has no <totalCount> element"))?;

    raw.trim()
        .parse()
        .map_err(|_| EtlError::parse(format!("totalCount '{}' is not a non-negative integer", raw)))
}

/// Extract one record per item element, in document order
///
/// Every record carries exactly the schema's fields. A field missing from an
/// item, or present without text, becomes an empty string.
pub fn extract(xml: &str, schema: &FieldSchema) -> Result<Vec<Record>> {
    let doc = parse_document(xml)?;
    if !doc.has_body {
        return Err(EtlError::parse("response has no <body> element"));
    }

    let items = doc
        .items
        .ok_or_else(|| EtlError::parse("response body has no <items> element"))?;

    Ok(items
        .into_iter()
        .map(|mut item| {
            Record::from_schema(schema, |name| {
                let raw = item.remove(name).unwrap_or_default();
                match schema.get(name) {
                    Some(field) => field.cleanup.apply(raw),
                    None => raw,
                }
            })
        })
        .collect())
}

fn parse_document(xml: &str) -> Result<PageDocument> {
    let mut reader = Reader::from_str(xml);
    // Values are kept verbatim, including padding.
    reader.config_mut().trim_text(false);

    let mut walker = Walker::default();

    loop {
        let event = reader.read_event().map_err(|e| {
            EtlError::parse(format!("malformed XML at byte {}: {}", reader.buffer_position(), e))
        })?;

        match event {
            Event::Start(e) => {
                walker.open(element_name(&e)?)?;
            },
            Event::Empty(e) => {
                walker.open(element_name(&e)?)?;
                walker.close();
            },
            Event::End(_) => walker.close(),
            Event::Text(t) => {
                let outside_root = walker.path.is_empty();
                if walker.capturing() || outside_root {
                    let text = t
                        .unescape()
                        .map_err(|e| EtlError::parse(format!("invalid character data: {}", e)))?;
                    if outside_root {
                        if !text.trim().is_empty() {
                            return Err(EtlError::parse("text outside the root element"));
                        }
                    } else {
                        walker.text(&text);
                    }
                }
            },
            Event::CData(c) => {
                if walker.path.is_empty() {
                    return Err(EtlError::parse("CDATA section outside the root element"));
                }
                if walker.capturing() {
                    let text = std::str::from_utf8(&c)
                        .map_err(|e| EtlError::parse(format!("invalid CDATA section: {}", e)))?;
                    walker.text(text);
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }

    walker.finish()
}

fn element_name(e: &BytesStart<'_>) -> Result<String> {
    std::str::from_utf8(e.local_name().as_ref())
        .map(str::to_string)
        .map_err(|err| EtlError::parse(format!("element name is not UTF-8: {}", err)))
}

/// Tracks the open element path and collects what the job needs
#[derive(Default)]
struct Walker {
    path: Vec<String>,
    saw_root: bool,
    doc: PageDocument,
    item: Option<Item>,
    capture: Option<String>,
}

impl Walker {
    fn in_body(&self) -> bool {
        self.path.len() >= BODY_DEPTH && self.path[1] == "body"
    }

    fn in_items(&self) -> bool {
        self.in_body() && self.path.len() >= ITEM_DEPTH && self.path[2] == "items"
    }

    fn at_total_count(&self) -> bool {
        self.in_body() && self.path.len() == TOTAL_COUNT_DEPTH && self.path[2] == "totalCount"
    }

    /// Only direct text of the captured element counts
    fn capturing(&self) -> bool {
        self.capture.is_some()
            && (self.path.len() == FIELD_DEPTH || self.path.len() == TOTAL_COUNT_DEPTH)
    }

    fn open(&mut self, name: String) -> Result<()> {
        if self.path.is_empty() {
            if self.saw_root {
                return Err(EtlError::parse(format!(
                    "unexpected second root element <{}>",
                    name
                )));
            }
            self.saw_root = true;
        }
        self.path.push(name);

        match self.path.len() {
            BODY_DEPTH if self.in_body() => self.doc.has_body = true,
            TOTAL_COUNT_DEPTH if self.at_total_count() => self.capture = Some(String::new()),
            ITEMS_DEPTH if self.in_body() && self.path[2] == "items" => {
                self.doc.items.get_or_insert_with(Vec::new);
            },
            ITEM_DEPTH if self.in_items() => self.item = Some(Item::new()),
            FIELD_DEPTH if self.in_items() && self.item.is_some() => {
                self.capture = Some(String::new())
            },
            _ => {},
        }

        Ok(())
    }

    fn text(&mut self, text: &str) {
        if let Some(buf) = self.capture.as_mut() {
            buf.push_str(text);
        }
    }

    fn close(&mut self) {
        match self.path.len() {
            TOTAL_COUNT_DEPTH if self.at_total_count() => {
                let text = self.capture.take().unwrap_or_default();
                self.doc.total_count.get_or_insert(text);
            },
            FIELD_DEPTH if self.in_items() => {
                let text = self.capture.take().unwrap_or_default();
                if let (Some(item), Some(name)) = (self.item.as_mut(), self.path.last()) {
                    // First occurrence wins, like an element-tree `find`.
                    item.entry(name.clone()).or_insert(text);
                }
            },
            ITEM_DEPTH if self.in_items() => {
                if let Some(item) = self.item.take() {
                    self.doc.items.get_or_insert_with(Vec::new).push(item);
                }
            },
            _ => {},
        }

        self.path.pop();
    }

    fn finish(self) -> Result<PageDocument> {
        if let Some(open) = self.path.last() {
            return Err(EtlError::parse(format!(
                "document ended inside unclosed element <{}>",
                open
            )));
        }
        if !self.saw_root {
            return Err(EtlError::parse("document has no root element"));
        }
        Ok(self.doc)
    }
}
