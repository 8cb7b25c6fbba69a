//! Name-tree traversal over the document's object arena
//!
//! A name tree is a set of nodes holding `/Names [key value ...]` leaves and
//! `/Kids [ref ...]` children. The walk uses an explicit worklist; every
//! indirect node is visited at most once and the total number of nodes is
//! bounded, so malformed or cyclic trees end the walk instead of recursing.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::pdf_document::{catalog_id, lookup_dict, resolve, resolve_dict};

use super::text::decode_text_string;

/// One `(key, value)` pair from a name-tree leaf
#[derive(Debug, Clone)]
pub struct NameTreeEntry {
    pub raw_key: Vec<u8>,
    pub key: String,
    pub value: Object,
}

/// `/Root /Names /EmbeddedFiles`, if every level is present
pub fn embedded_files_root(doc: &Document) -> Option<&Dictionary> {
    let catalog = doc.objects.get(&catalog_id(doc).ok()?).and_then(|o| resolve_dict(doc, o))?;
    let names = lookup_dict(doc, catalog, b"Names")?;
    lookup_dict(doc, names, b"EmbeddedFiles")
}

enum Visit {
    Stop,
    Continue,
}

/// Visits leaf entries in key order until `visitor` asks to stop
fn walk<'a, F>(doc: &'a Document, root: &'a Dictionary, max_nodes: usize, mut visitor: F)
where
    F: FnMut(&'a [u8], &'a Object) -> Visit,
{
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut worklist: Vec<&'a Dictionary> = vec![root];
    let mut nodes = 0usize;

    while let Some(node) = worklist.pop() {
        nodes += 1;
        if nodes > max_nodes {
            warn!("name tree walk stopped after {} nodes", max_nodes);
            return;
        }

        if let Some(Object::Array(pairs)) = node.get(b"Names").ok().and_then(|o| resolve(doc, o)) {
            for pair in pairs.chunks(2) {
                let [key, value] = pair else {
                    debug!("ignoring unpaired name-tree key");
                    continue;
                };
                let Some(Object::String(raw, _)) = resolve(doc, key) else {
                    debug!("ignoring non-string name-tree key");
                    continue;
                };
                if let Visit::Stop = visitor(raw.as_slice(), value) {
                    return;
                }
            }
        }

        if let Some(Object::Array(kids)) = node.get(b"Kids").ok().and_then(|o| resolve(doc, o)) {
            // Reverse so the leftmost kid is popped first
            for kid in kids.iter().rev() {
                if let Object::Reference(id) = kid {
                    if !visited.insert(*id) {
                        debug!("skipping revisited name-tree node {} {} R", id.0, id.1);
                        continue;
                    }
                }
                match resolve_dict(doc, kid) {
                    Some(child) => worklist.push(child),
                    None => debug!("ignoring name-tree kid that is not a dictionary"),
                }
            }
        }
    }
}

/// Every leaf entry of the tree, in traversal order
pub fn collect_entries(doc: &Document, root: &Dictionary, max_nodes: usize) -> Vec<NameTreeEntry> {
    let mut entries = Vec::new();
    walk(doc, root, max_nodes, |raw, value| {
        entries.push(NameTreeEntry {
            raw_key: raw.to_vec(),
            key: decode_text_string(raw),
            value: value.clone(),
        });
        Visit::Continue
    });
    entries
}

/// First leaf entry whose decoded key equals `name`
pub fn find_entry<'a>(doc: &'a Document, root: &'a Dictionary, name: &str, max_nodes: usize) -> Option<&'a Object> {
    let mut found = None;
    walk(doc, root, max_nodes, |raw, value| {
        if decode_text_string(raw) == name {
            found = Some(value);
            Visit::Stop
        } else {
            Visit::Continue
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf_document::literal;

    fn leaf(doc: &mut Document, pairs: &[(&[u8], i64)]) -> ObjectId {
        let mut names = Vec::new();
        for (key, value) in pairs {
            names.push(literal(key));
            names.push(Object::Integer(*value));
        }
        let mut dict = Dictionary::new();
        dict.set("Names", Object::Array(names));
        doc.add_object(Object::Dictionary(dict))
    }

    #[test]
    fn test_walks_kids_in_order() {
        let mut doc = Document::with_version("1.5");
        let left = leaf(&mut doc, &[(&b"a.txt"[..], 1), (&b"b.txt"[..], 2)]);
        let right = leaf(&mut doc, &[(&b"proof.json"[..], 3)]);
        let mut root = Dictionary::new();
        root.set("Kids", Object::Array(vec![Object::Reference(left), Object::Reference(right)]));

        let keys: Vec<String> = collect_entries(&doc, &root, 16).into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["a.txt", "b.txt", "proof.json"]);
        assert!(matches!(find_entry(&doc, &root, "proof.json", 16), Some(Object::Integer(3))));
        assert!(find_entry(&doc, &root, "missing", 16).is_none());
    }

    #[test]
    fn test_cycle_terminates() {
        let mut doc = Document::with_version("1.5");
        let node_id = doc.new_object_id();
        let mut node = Dictionary::new();
        node.set("Kids", Object::Array(vec![Object::Reference(node_id)]));
        doc.objects.insert(node_id, Object::Dictionary(node.clone()));
        assert!(collect_entries(&doc, &node, 1000).is_empty());
    }

    #[test]
    fn test_utf16_key_matches() {
        let mut doc = Document::with_version("1.5");
        let mut key = vec![0xFE, 0xFF];
        for unit in "proof.json".encode_utf16() {
            key.extend_from_slice(&unit.to_be_bytes());
        }
        let id = leaf(&mut doc, &[(key.as_slice(), 7)]);
        let root = match doc.objects.get(&id) {
            Some(Object::Dictionary(d)) => d.clone(),
            _ => unreachable!(),
        };
        assert!(matches!(find_entry(&doc, &root, "proof.json", 4), Some(Object::Integer(7))));
    }

    #[test]
    fn test_node_budget() {
        let mut doc = Document::with_version("1.5");
        let kids: Vec<Object> = (0..10).map(|i| Object::Reference(leaf(&mut doc, &[(&b"x"[..], i)]))).collect();
        let mut root = Dictionary::new();
        root.set("Kids", Object::Array(kids));
        assert_eq!(collect_entries(&doc, &root, 4).len(), 3);
    }
}
