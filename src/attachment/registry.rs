//! Writes payloads into `/Root /Names /EmbeddedFiles`

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

use crate::config::AttachmentConfig;
use crate::error::{Error, Result};
use crate::pdf_document::{catalog_id, literal, name, reachable_objects};
use crate::types::EmbeddedPayload;

use super::filters::deflate;
use super::name_tree::{collect_entries, embedded_files_root, NameTreeEntry};
use super::text::encode_text_string;

/// Stores `payload` under its name, replacing any entry with the same name.
///
/// Existing entries are kept. The tree is rewritten as one leaf sorted by key
/// bytes, which is what readers binary-search on. Objects only the previous
/// tree or a replaced entry referenced are dropped.
pub fn register_payload(doc: &mut Document, payload: &EmbeddedPayload, config: &AttachmentConfig) -> Result<()> {
    let reachable_before = reachable_objects(doc);
    let mut entries: Vec<NameTreeEntry> = match embedded_files_root(doc) {
        Some(root) => collect_entries(doc, root, config.max_tree_nodes),
        None => Vec::new(),
    };
    let before = entries.len();
    entries.retain(|entry| entry.key != payload.name);
    if entries.len() != before {
        debug!("replacing {} existing '{}' entr(ies)", before - entries.len(), payload.name);
    }

    let filespec_id = add_file(doc, payload, config)?;
    entries.push(NameTreeEntry {
        raw_key: encode_text_string(&payload.name),
        key: payload.name.clone(),
        value: Object::Reference(filespec_id),
    });
    entries.sort_by(|a, b| a.raw_key.cmp(&b.raw_key));

    let mut pairs = Vec::with_capacity(entries.len() * 2);
    for entry in &entries {
        pairs.push(Object::String(entry.raw_key.clone(), StringFormat::Literal));
        pairs.push(entry.value.clone());
    }
    let mut leaf = Dictionary::new();
    leaf.set("Names", Object::Array(pairs));
    let tree_id = doc.add_object(Object::Dictionary(leaf));

    attach_tree(doc, tree_id)?;

    let reachable_after = reachable_objects(doc);
    let orphaned: Vec<ObjectId> = reachable_before.difference(&reachable_after).copied().collect();
    for id in &orphaned {
        doc.objects.remove(id);
    }
    debug!(
        "registry now holds {} entr(ies), dropped {} orphaned object(s)",
        entries.len(),
        orphaned.len()
    );
    Ok(())
}

/// Adds the embedded file stream and its file specification
fn add_file(doc: &mut Document, payload: &EmbeddedPayload, config: &AttachmentConfig) -> Result<ObjectId> {
    let mut params = Dictionary::new();
    params.set("Size", Object::Integer(payload.len() as i64));

    let mut dict = Dictionary::new();
    dict.set("Type", name("EmbeddedFile"));
    dict.set("Subtype", name(&payload.mime_type));
    dict.set("Params", Object::Dictionary(params));
    let content = if config.compress {
        dict.set("Filter", name("FlateDecode"));
        deflate(&payload.bytes)?
    } else {
        payload.bytes.clone()
    };
    let stream_id = doc.add_object(Object::Stream(Stream::new(dict, content)));

    let file_name = encode_text_string(&payload.name);
    let mut ef = Dictionary::new();
    ef.set("F", Object::Reference(stream_id));
    ef.set("UF", Object::Reference(stream_id));

    let mut filespec = Dictionary::new();
    filespec.set("Type", name("Filespec"));
    filespec.set("F", literal(&file_name));
    filespec.set("UF", literal(&file_name));
    filespec.set("Desc", literal(&encode_text_string(&config.description)));
    filespec.set("EF", Object::Dictionary(ef));
    Ok(doc.add_object(Object::Dictionary(filespec)))
}

/// Points the catalog's `/Names /EmbeddedFiles` at `tree_id`, creating
/// `/Names` when absent and keeping its other trees
fn attach_tree(doc: &mut Document, tree_id: ObjectId) -> Result<()> {
    let catalog_id = catalog_id(doc)?;
    let names_ref = match doc.objects.get(&catalog_id) {
        Some(Object::Dictionary(catalog)) => match catalog.get(b"Names") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        },
        _ => return Err(Error::MalformedDocument("catalog is not a dictionary".into())),
    };

    if let Some(id) = names_ref {
        if let Some(Object::Dictionary(names)) = doc.objects.get_mut(&id) {
            names.set("EmbeddedFiles", Object::Reference(tree_id));
            return Ok(());
        }
    }

    let Some(Object::Dictionary(catalog)) = doc.objects.get_mut(&catalog_id) else {
        return Err(Error::MalformedDocument("catalog is not a dictionary".into()));
    };
    let has_direct_names = matches!(catalog.get(b"Names"), Ok(Object::Dictionary(_)));
    if has_direct_names {
        if let Ok(Object::Dictionary(names)) = catalog.get_mut(b"Names") {
            names.set("EmbeddedFiles", Object::Reference(tree_id));
        }
    } else {
        let mut names = Dictionary::new();
        names.set("EmbeddedFiles", Object::Reference(tree_id));
        catalog.set("Names", Object::Dictionary(names));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::name_tree::find_entry;
    use crate::canonical::fresh_baseline;

    #[test]
    fn test_replaces_reserved_entry() {
        let mut doc = fresh_baseline().unwrap();
        let config = AttachmentConfig::default();
        register_payload(&mut doc, &EmbeddedPayload::new("proof.json", "application/json", b"{}".to_vec()), &config)
            .unwrap();
        register_payload(&mut doc, &EmbeddedPayload::new("a.txt", "text/plain", b"a".to_vec()), &config).unwrap();
        register_payload(
            &mut doc,
            &EmbeddedPayload::new("proof.json", "application/json", b"{\"v\":2}".to_vec()),
            &config,
        )
        .unwrap();

        let root = embedded_files_root(&doc).unwrap();
        let keys: Vec<String> = collect_entries(&doc, root, 16).into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["a.txt", "proof.json"]);
        assert!(find_entry(&doc, root, "proof.json", 16).is_some());
    }

    #[test]
    fn test_replacing_entry_drops_old_objects() {
        let mut doc = fresh_baseline().unwrap();
        let config = AttachmentConfig::default();
        let payload = EmbeddedPayload::new("proof.json", "application/json", b"{}".to_vec());
        register_payload(&mut doc, &payload, &config).unwrap();
        let count = doc.objects.len();

        register_payload(&mut doc, &payload, &config).unwrap();
        register_payload(&mut doc, &payload, &config).unwrap();
        assert_eq!(doc.objects.len(), count);

        let orphan = doc.add_object(Object::Null);
        register_payload(&mut doc, &payload, &config).unwrap();
        assert!(doc.objects.contains_key(&orphan));
    }

    #[test]
    fn test_keeps_other_name_trees() {
        let mut doc = fresh_baseline().unwrap();
        let dests_id = doc.add_object(Object::Dictionary(Dictionary::new()));
        let mut names = Dictionary::new();
        names.set("Dests", Object::Reference(dests_id));
        let names_id = doc.add_object(Object::Dictionary(names));
        let root = catalog_id(&doc).unwrap();
        if let Some(Object::Dictionary(catalog)) = doc.objects.get_mut(&root) {
            catalog.set("Names", Object::Reference(names_id));
        }

        register_payload(&mut doc, &EmbeddedPayload::new("proof.json", "application/json", vec![]), &AttachmentConfig::default())
            .unwrap();
        let Some(Object::Dictionary(names)) = doc.objects.get(&names_id) else { panic!("names dictionary lost") };
        assert!(names.has(b"Dests"));
        assert!(names.has(b"EmbeddedFiles"));
    }
}
