#![allow(dead_code)]

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use pdf_notary::error::Result;
use pdf_notary::issuer::Issuer;
use pdf_notary::pdf_document::{load_document, page_ids, save_document};
use pdf_notary::types::ProofObject;
use serde_json::{json, Value};

/// Producer quirks applied when building a fixture
#[derive(Debug, Clone, Default)]
pub struct Producer {
    pub version: &'static str,
    pub title: Option<&'static str>,
    pub with_id: bool,
    /// Unused objects allocated first, shifting every object number
    pub padding: usize,
    pub compress: bool,
    pub media_box_on_tree: bool,
}

impl Producer {
    pub fn plain() -> Self {
        Self {
            version: "1.5",
            ..Self::default()
        }
    }
}

pub struct TestFixtures;

impl TestFixtures {
    /// One Letter-sized page drawing `text` in Helvetica
    pub fn single_page(text: &str) -> Vec<u8> {
        Self::build(&[text], &Producer::plain())
    }

    pub fn multi_page(texts: &[&str]) -> Vec<u8> {
        Self::build(texts, &Producer::plain())
    }

    /// Pages sharing one font object through their resources
    pub fn build(texts: &[&str], producer: &Producer) -> Vec<u8> {
        let mut doc = Document::with_version(producer.version);
        for _ in 0..producer.padding {
            doc.add_object(Object::Null);
        }
        let pages_id = doc.new_object_id();

        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"Type1".to_vec()));
        font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
        let font_id = doc.add_object(Object::Dictionary(font));
        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));

        let mut kids = Vec::new();
        for text in texts {
            let content = format!("BT /F1 24 Tf 72 700 Td ({}) Tj ET", text).into_bytes();
            let stream = if producer.compress {
                let mut dict = Dictionary::new();
                dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
                Stream::new(dict, zlib(&content))
            } else {
                Stream::new(Dictionary::new(), content)
            };
            let content_id = doc.add_object(Object::Stream(stream));

            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            if !producer.media_box_on_tree {
                page.set("MediaBox", media_box(612, 792));
                page.set("Resources", Object::Dictionary(resources.clone()));
            }
            page.set("Contents", Object::Reference(content_id));
            kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
        }

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(kids.len() as i64));
        pages.set("Kids", Object::Array(kids));
        if producer.media_box_on_tree {
            pages.set("MediaBox", media_box(300, 400));
            pages.set("Resources", Object::Dictionary(resources));
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        if let Some(title) = producer.title {
            let mut info = Dictionary::new();
            info.set("Title", Object::String(title.as_bytes().to_vec(), StringFormat::Literal));
            info.set("Producer", Object::String(b"Fixture Writer".to_vec(), StringFormat::Literal));
            let info_id = doc.add_object(Object::Dictionary(info));
            doc.trailer.set("Info", Object::Reference(info_id));
        }
        if producer.with_id {
            let id = Object::String(vec![0xAB; 16], StringFormat::Hexadecimal);
            doc.trailer.set("ID", Object::Array(vec![id.clone(), id]));
        }

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    /// One page of the given size drawing a form XObject scaled by `scale`
    pub fn scaled_form(scale: f64, width: f64, height: f64) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut form = Dictionary::new();
        form.set("Type", Object::Name(b"XObject".to_vec()));
        form.set("Subtype", Object::Name(b"Form".to_vec()));
        form.set("BBox", media_box(100, 100));
        form.set(
            "Matrix",
            Object::Array(
                [scale, 0.0, 0.0, scale, 0.0, 0.0]
                    .iter()
                    .map(|v| Object::Real(*v as _))
                    .collect(),
            ),
        );
        let form_id = doc.add_object(Object::Stream(Stream::new(form, b"0 0 100 100 re f".to_vec())));
        let mut xobjects = Dictionary::new();
        xobjects.set("Fm1", Object::Reference(form_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));
        let content_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), b"/Fm1 Do".to_vec())));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width as _),
                Object::Real(height as _),
            ]),
        );
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Reference(content_id));
        let page_id = doc.add_object(Object::Dictionary(page));

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(1));
        pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        save_document(&doc).unwrap()
    }

    /// Rewrites `from` to `to` in the first page's content stream
    pub fn edit_first_page(bytes: &[u8], from: &str, to: &str) -> Vec<u8> {
        let mut doc = load_document(bytes).unwrap();
        let first = page_ids(&doc)[0];
        let content_id: ObjectId = match doc.objects.get(&first) {
            Some(Object::Dictionary(page)) => match page.get(b"Contents") {
                Ok(Object::Reference(id)) => *id,
                other => panic!("unexpected contents {:?}", other),
            },
            other => panic!("unexpected page {:?}", other),
        };
        match doc.objects.get_mut(&content_id) {
            Some(Object::Stream(stream)) => {
                let edited = String::from_utf8_lossy(&stream.content).replace(from, to);
                stream.set_content(edited.into_bytes());
            }
            other => panic!("unexpected content stream {:?}", other),
        }
        save_document(&doc).unwrap()
    }
}

/// Deterministic issuer that wraps the claim without signing it
pub struct FakeIssuer;

impl Issuer for FakeIssuer {
    fn id(&self) -> &str {
        "did:example:test-issuer"
    }

    fn sign(&self, claim: &Value) -> Result<ProofObject> {
        ProofObject::from_value(json!({
            "issuer": self.id(),
            "credentialSubject": claim,
        }))
    }
}

fn media_box(width: i64, height: i64) -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(width),
        Object::Integer(height),
    ])
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
