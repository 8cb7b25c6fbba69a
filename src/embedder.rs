//! Proof embedding: appends the presentation page and registers the proof
//! as an embedded file on a canonical document

use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument};

use crate::attachment::filters::deflate;
use crate::attachment::register_payload;
use crate::config::{AttachmentConfig, NotaryConfig, PresentationConfig};
use crate::error::{Error, Result};
use crate::pdf_document::{load_document, name, page_ids, page_size, pages_root_id, save_document};
use crate::presentation::{CodeImage, NoticeLayout, NoticeRenderer, PaymentCodeRenderer, PresentationSpec, QrCodeRenderer};
use crate::reconstructor::APPENDED_PAGES;
use crate::types::{EmbeddedPayload, NotarizedDocument, ProofObject, RawDocument};

const FONT_RESOURCE: &str = "F1";
const CODE_RESOURCE: &str = "Code";

pub struct ProofEmbedder {
    attachment: AttachmentConfig,
    presentation: PresentationConfig,
    notice: NoticeRenderer,
    renderer: Arc<dyn PaymentCodeRenderer>,
}

impl ProofEmbedder {
    pub fn new(config: &NotaryConfig) -> Self {
        Self::with_renderer(config, Arc::new(QrCodeRenderer::new()))
    }

    pub fn with_renderer(config: &NotaryConfig, renderer: Arc<dyn PaymentCodeRenderer>) -> Self {
        Self {
            attachment: config.attachment.clone(),
            presentation: config.presentation.clone(),
            notice: NoticeRenderer::new(&config.presentation),
            renderer,
        }
    }

    /// Builds the notarized document. Presentation inputs are validated and
    /// the payment code rendered before the raw document is reopened.
    #[instrument(skip_all, fields(pages = raw.page_count()))]
    pub fn embed(&self, raw: &RawDocument, proof: &ProofObject, spec: &PresentationSpec) -> Result<NotarizedDocument> {
        spec.validate(&self.presentation)?;
        let lines = self.notice.compose_lines(spec)?;
        let code = self.renderer.render(&spec.payment_address)?;
        let proof_bytes = proof.to_bytes()?;

        let mut doc = load_document(raw.bytes())?;
        let pages = page_ids(&doc);
        let first = *pages
            .first()
            .ok_or_else(|| Error::MalformedDocument("raw document has no pages".into()))?;
        let (width, height) = page_size(&doc, first)?;

        let page_id = self.append_presentation_page(&mut doc, &lines, &code, width, height)?;
        debug!("appended presentation page {} {} R ({}x{})", page_id.0, page_id.1, width, height);

        let payload = EmbeddedPayload::new(
            self.attachment.reserved_name.as_str(),
            self.attachment.mime_type.as_str(),
            proof_bytes,
        );
        register_payload(&mut doc, &payload, &self.attachment)?;

        let bytes = save_document(&doc)?;
        let page_count = pages.len() + APPENDED_PAGES;
        info!(
            "embedded {} byte proof as '{}', {} pages, {} bytes",
            payload.len(),
            payload.name,
            page_count,
            bytes.len()
        );
        Ok(NotarizedDocument::new(bytes, page_count))
    }

    fn append_presentation_page(
        &self,
        doc: &mut Document,
        lines: &[String],
        code: &CodeImage,
        width: f64,
        height: f64,
    ) -> Result<ObjectId> {
        let parent = pages_root_id(doc)?;

        let mut font = Dictionary::new();
        font.set("Type", name("Font"));
        font.set("Subtype", name("Type1"));
        font.set("BaseFont", name("Helvetica"));
        font.set("Encoding", name("WinAnsiEncoding"));
        let font_id = doc.add_object(Object::Dictionary(font));
        let image_id = doc.add_object(Object::Stream(code_image_stream(code)?));

        let margin = i64::from(self.presentation.margin);
        let size = i64::from(self.presentation.code_size)
            .min(width as i64 - 2 * margin)
            .min(self.notice.text_top(height) - margin)
            .max(1);
        // The code and one blank line are kept clear below the text
        let layout = self
            .notice
            .layout(lines, width, height, size + i64::from(self.presentation.leading));
        let mut operations = layout.operations(FONT_RESOURCE);
        let (x, y) = place_code(&layout, size, margin);
        operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(size),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(size),
                    Object::Integer(x),
                    Object::Integer(y),
                ],
            ),
            Operation::new("Do", vec![name(CODE_RESOURCE)]),
            Operation::new("Q", vec![]),
        ]);
        let content = Content { operations }.encode().map_err(Error::serialization)?;
        let content_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), content)));

        let mut fonts = Dictionary::new();
        fonts.set(FONT_RESOURCE, Object::Reference(font_id));
        let mut xobjects = Dictionary::new();
        xobjects.set(CODE_RESOURCE, Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page = Dictionary::new();
        page.set("Type", name("Page"));
        page.set("Parent", Object::Reference(parent));
        page.set(
            "MediaBox",
            Object::Array(vec![Object::Integer(0), Object::Integer(0), number(width), number(height)]),
        );
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Reference(content_id));
        let page_id = doc.add_object(Object::Dictionary(page));

        match doc.objects.get_mut(&parent) {
            Some(Object::Dictionary(tree)) => {
                let count = match tree.get_mut(b"Kids") {
                    Ok(Object::Array(kids)) => {
                        kids.push(Object::Reference(page_id));
                        kids.len()
                    }
                    _ => return Err(Error::MalformedDocument("page tree has no direct /Kids array".into())),
                };
                tree.set("Count", Object::Integer(count as i64));
            }
            _ => return Err(Error::MalformedDocument("page tree root is not a dictionary".into())),
        }
        Ok(page_id)
    }
}

/// Lower-left corner of a `size` square code under the notice text
fn place_code(layout: &NoticeLayout, size: i64, margin: i64) -> (i64, i64) {
    let below_text = if layout.lines.is_empty() {
        layout.top
    } else {
        layout.bottom() - layout.leading
    };
    (margin, (below_text - size).max(margin))
}

/// Flate-compressed 8-bit `/DeviceGray` image XObject
fn code_image_stream(code: &CodeImage) -> Result<Stream> {
    let mut dict = Dictionary::new();
    dict.set("Type", name("XObject"));
    dict.set("Subtype", name("Image"));
    dict.set("Width", Object::Integer(i64::from(code.width)));
    dict.set("Height", Object::Integer(i64::from(code.height)));
    dict.set("ColorSpace", name("DeviceGray"));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", name("FlateDecode"));
    Ok(Stream::new(dict, deflate(&code.luma)?))
}

fn number(value: f64) -> Object {
    if value.fract() == 0.0 {
        Object::Integer(value as i64)
    } else {
        Object::Real(value as _)
    }
}
