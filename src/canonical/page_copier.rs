//! Page copy into the baseline template
//!
//! Objects reachable from a page's resources and contents are copied once
//! each, renumbered in depth-first discovery order. `/Parent` links are never
//! followed, so nothing outside the page's own content comes along.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::pdf_document::{default_media_box, inherited_attribute, name, resolve};

/// Page keys carried into the baseline, in output order. Inheritable ones are
/// resolved through the source page tree.
const BOX_KEYS: [&[u8]; 2] = [b"MediaBox", b"CropBox"];

pub struct PageCopier<'a> {
    source: &'a Document,
    target: &'a mut Document,
    remap: BTreeMap<ObjectId, ObjectId>,
    max_depth: usize,
}

impl<'a> PageCopier<'a> {
    pub fn new(source: &'a Document, target: &'a mut Document, max_depth: usize) -> Self {
        Self {
            source,
            target,
            remap: BTreeMap::new(),
            max_depth,
        }
    }

    /// Number of indirect objects copied so far
    pub fn copied_objects(&self) -> usize {
        self.remap.len()
    }

    /// Copies one source page under `parent` and returns the new page id
    pub fn copy_page(&mut self, page_id: ObjectId, parent: ObjectId) -> Result<ObjectId> {
        let source = self.source;
        let page = match source.objects.get(&page_id).and_then(|o| resolve(source, o)) {
            Some(Object::Dictionary(dict)) => dict,
            _ => {
                return Err(Error::MalformedDocument(format!(
                    "page {} {} R is not a dictionary",
                    page_id.0, page_id.1
                )))
            }
        };

        let new_id = self.target.new_object_id();
        let mut dict = Dictionary::new();
        dict.set("Type", name("Page"));
        dict.set("Parent", Object::Reference(parent));

        for key in BOX_KEYS {
            match inherited_attribute(source, page, key) {
                Some(value) => {
                    let value = self.copy_direct(value)?;
                    dict.set(key, value);
                }
                None if key == b"MediaBox" => dict.set(key, default_media_box()),
                None => {}
            }
        }
        if let Some(Object::Integer(degrees)) =
            inherited_attribute(source, page, b"Rotate").and_then(|o| resolve(source, o))
        {
            let degrees = degrees.rem_euclid(360);
            if degrees != 0 {
                dict.set("Rotate", Object::Integer(degrees));
            }
        }

        let resources = match inherited_attribute(source, page, b"Resources") {
            Some(value) => self.copy_direct(value)?,
            None => Object::Dictionary(Dictionary::new()),
        };
        dict.set("Resources", resources);

        if let Ok(contents) = page.get(b"Contents") {
            let contents = self.copy_contents(contents)?;
            dict.set("Contents", contents);
        }

        self.target.objects.insert(new_id, Object::Dictionary(dict));
        debug!(
            "copied page {} {} R as {} {} R ({} objects so far)",
            page_id.0,
            page_id.1,
            new_id.0,
            new_id.1,
            self.remap.len()
        );
        Ok(new_id)
    }

    /// Content streams stay indirect; a referenced array is inlined
    fn copy_contents(&mut self, contents: &'a Object) -> Result<Object> {
        let source = self.source;
        match contents {
            Object::Reference(id) => match source.objects.get(id) {
                Some(Object::Array(_)) => self.copy_direct(contents),
                _ => self.copy_object(contents, 0),
            },
            other => self.copy_object(other, 0),
        }
    }

    /// Copies the value behind a reference as a direct object, unless it is a stream
    fn copy_direct(&mut self, value: &'a Object) -> Result<Object> {
        let source = self.source;
        match resolve(source, value) {
            Some(Object::Stream(_)) => self.copy_object(value, 0),
            Some(direct) => self.copy_object(direct, 0),
            None => Ok(Object::Null),
        }
    }

    fn copy_object(&mut self, object: &'a Object, depth: usize) -> Result<Object> {
        if depth > self.max_depth {
            return Err(Error::MalformedDocument(format!(
                "page resources nest deeper than {} levels",
                self.max_depth
            )));
        }
        Ok(match object {
            Object::Reference(id) => self.copy_reference(*id, depth)?,
            Object::Array(items) => {
                let mut copied = Vec::with_capacity(items.len());
                for item in items {
                    copied.push(self.copy_object(item, depth + 1)?);
                }
                Object::Array(copied)
            }
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(dict, depth + 1, false)?),
            Object::Stream(stream) => {
                let dict = self.copy_dictionary(&stream.dict, depth + 1, true)?;
                Object::Stream(Stream::new(dict, stream.content.clone()))
            }
            other => other.clone(),
        })
    }

    fn copy_dictionary(&mut self, dict: &'a Dictionary, depth: usize, is_stream: bool) -> Result<Dictionary> {
        let mut copied = Dictionary::new();
        for (key, value) in dict.iter() {
            if key.as_slice() == b"Parent" || (is_stream && key.as_slice() == b"Length") {
                continue;
            }
            let value = self.copy_object(value, depth)?;
            copied.set(key.clone(), value);
        }
        Ok(copied)
    }

    fn copy_reference(&mut self, id: ObjectId, depth: usize) -> Result<Object> {
        if let Some(mapped) = self.remap.get(&id) {
            return Ok(Object::Reference(*mapped));
        }
        let source = self.source;
        let Some(original) = source.objects.get(&id) else {
            // Dangling references read as null
            trace!("dangling reference {} {} R", id.0, id.1);
            return Ok(Object::Null);
        };
        let new_id = self.target.new_object_id();
        self.remap.insert(id, new_id);
        let copied = self.copy_object(original, depth + 1)?;
        self.target.objects.insert(new_id, copied);
        Ok(Object::Reference(new_id))
    }
}
