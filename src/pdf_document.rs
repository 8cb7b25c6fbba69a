//! PDF object-model helpers shared by the pipeline stages
//!
//! Everything here treats `lopdf::Document::objects` as an arena keyed by
//! object id: references are resolved by lookup, never followed recursively
//! without a bound.

use std::collections::BTreeSet;

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

use crate::error::{Error, Result};

/// Page box used when neither the page nor its ancestors declare one (US Letter)
pub const DEFAULT_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// Upper bound on reference chains and page-tree ancestry walks
const MAX_INDIRECTION: usize = 32;

/// Parses bytes as a PDF the pipeline can work with
pub fn load_document(bytes: &[u8]) -> Result<Document> {
    if bytes.is_empty() {
        return Err(Error::MalformedDocument("empty input".into()));
    }
    let doc = Document::load_mem(bytes)?;
    if doc.trailer.has(b"Encrypt") {
        return Err(Error::MalformedDocument("encrypted documents are not supported".into()));
    }
    Ok(doc)
}

/// Serializes a document with the deterministic writer
pub fn save_document(doc: &Document) -> Result<Vec<u8>> {
    Ok(crate::pdf_writer::write_document(doc)?)
}

/// Follows a chain of references to a direct object
pub fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_INDIRECTION {
        match obj {
            Object::Reference(id) => obj = doc.objects.get(id)?,
            other => return Some(other),
        }
    }
    None
}

pub fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

/// Looks up `key` in `dict` and resolves the value
pub fn lookup<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    resolve(doc, dict.get(key).ok()?)
}

pub fn lookup_dict<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    resolve_dict(doc, dict.get(key).ok()?)
}

/// Id of the document catalog
pub fn catalog_id(doc: &Document) -> Result<ObjectId> {
    match doc.trailer.get(b"Root") {
        Ok(Object::Reference(id)) => Ok(*id),
        _ => Err(Error::MalformedDocument("trailer has no /Root reference".into())),
    }
}

/// Id of the root page-tree node
pub fn pages_root_id(doc: &Document) -> Result<ObjectId> {
    let catalog = doc
        .objects
        .get(&catalog_id(doc)?)
        .and_then(|o| resolve_dict(doc, o))
        .ok_or_else(|| Error::MalformedDocument("catalog is not a dictionary".into()))?;
    match catalog.get(b"Pages") {
        Ok(Object::Reference(id)) => Ok(*id),
        _ => Err(Error::MalformedDocument("catalog has no /Pages reference".into())),
    }
}

/// Page object ids in document order
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Finds a page attribute on the page itself or, for inheritable keys, on an ancestor
pub fn inherited_attribute<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAX_INDIRECTION {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        node = lookup_dict(doc, node, b"Parent")?;
    }
    None
}

/// Numeric value of an integer or real object
pub fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

pub fn as_integer(obj: &Object) -> Option<i64> {
    match obj {
        Object::Integer(i) => Some(*i),
        _ => None,
    }
}

/// Width and height of a page's media box
pub fn page_size(doc: &Document, page_id: ObjectId) -> Result<(f64, f64)> {
    let page = doc
        .objects
        .get(&page_id)
        .and_then(|o| resolve_dict(doc, o))
        .ok_or_else(|| Error::MalformedDocument(format!("page {:?} is not a dictionary", page_id)))?;
    let rect = inherited_attribute(doc, page, b"MediaBox")
        .and_then(|o| resolve(doc, o))
        .and_then(|o| match o {
            Object::Array(items) if items.len() == 4 => {
                items.iter().map(|i| resolve(doc, i).and_then(as_number)).collect::<Option<Vec<f64>>>()
            }
            _ => None,
        });
    let rect = match rect {
        Some(r) => r,
        None => DEFAULT_MEDIA_BOX.iter().map(|v| *v as f64).collect(),
    };
    let width = (rect[2] - rect[0]).abs();
    let height = (rect[3] - rect[1]).abs();
    if width <= 0.0 || height <= 0.0 {
        return Err(Error::MalformedDocument(format!("page {:?} has an empty media box", page_id)));
    }
    Ok((width, height))
}

pub fn default_media_box() -> Object {
    Object::Array(DEFAULT_MEDIA_BOX.iter().map(|v| Object::Integer(*v)).collect())
}

pub fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

pub fn literal(value: &[u8]) -> Object {
    Object::String(value.to_vec(), StringFormat::Literal)
}

/// Name object value, if `obj` is a name
pub fn name_str(obj: &Object) -> Option<String> {
    match obj {
        Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
        _ => None,
    }
}

/// Ids of every object reachable from the trailer
pub fn reachable_objects(doc: &Document) -> BTreeSet<ObjectId> {
    let mut seen = BTreeSet::new();
    let mut pending: Vec<&Object> = doc.trailer.iter().map(|(_, value)| value).collect();
    while let Some(object) = pending.pop() {
        match object {
            Object::Reference(id) => {
                if seen.insert(*id) {
                    if let Some(target) = doc.objects.get(id) {
                        pending.push(target);
                    }
                }
            }
            Object::Array(items) => pending.extend(items.iter()),
            Object::Dictionary(dict) => pending.extend(dict.iter().map(|(_, value)| value)),
            Object::Stream(stream) => pending.extend(stream.dict.iter().map(|(_, value)| value)),
            _ => {}
        }
    }
    seen
}
