//! PDF serializer used for every document the pipeline produces
//!
//! Output is a function of the object arena alone: objects in id order, a
//! classic xref table and a trailer whose `/Size` is recomputed. Reals are
//! written with the shortest decimal that parses back to the same value, so
//! page geometry and resource matrices are kept exactly.

use std::collections::BTreeSet;
use std::io::{self, Write};

use lopdf::{Dictionary, Document, Object, StringFormat};
use tracing::trace;

/// Serializes `doc` into a fresh buffer
pub fn write_document(doc: &Document) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    writeln!(out, "%PDF-{}", doc.version)?;
    out.write_all(b"%\xE2\xE3\xCF\xD3\n")?;

    let mut written = BTreeSet::new();
    let mut offsets = Vec::new();
    for (id, object) in &doc.objects {
        // One generation per object number
        if !written.insert(id.0) {
            trace!("skipping second generation of object {}", id.0);
            continue;
        }
        offsets.push((id.0, id.1, out.len()));
        writeln!(out, "{} {} obj", id.0, id.1)?;
        write_object(&mut out, object)?;
        out.write_all(b"\nendobj\n")?;
    }

    let size = written.iter().next_back().map_or(1, |n| n + 1);
    let xref_offset = out.len();
    writeln!(out, "xref\n0 {}", size)?;
    out.write_all(b"0000000000 65535 f \n")?;
    let mut entries = offsets.iter().peekable();
    for number in 1..size {
        match entries.peek() {
            Some((n, generation, offset)) if *n == number => {
                writeln!(out, "{:010} {:05} n ", offset, generation)?;
                entries.next();
            }
            _ => out.write_all(b"0000000000 00000 f \n")?,
        }
    }

    let mut trailer = doc.trailer.clone();
    trailer.remove(b"Prev");
    trailer.remove(b"XRefStm");
    trailer.set("Size", Object::Integer(i64::from(size)));
    out.write_all(b"trailer\n")?;
    write_dictionary(&mut out, &trailer, None)?;
    writeln!(out, "\nstartxref\n{}\n%%EOF", xref_offset)?;
    Ok(out)
}

fn write_object(out: &mut Vec<u8>, object: &Object) -> io::Result<()> {
    match object {
        Object::Null => out.write_all(b"null"),
        Object::Boolean(value) => out.write_all(if *value { b"true" } else { b"false" }),
        Object::Integer(value) => write!(out, "{}", value),
        Object::Real(value) => out.write_all(format_real(f64::from(*value)).as_bytes()),
        Object::Name(name) => write_name(out, name),
        Object::String(bytes, StringFormat::Literal) => write_literal(out, bytes),
        Object::String(bytes, StringFormat::Hexadecimal) => {
            out.write_all(b"<")?;
            out.write_all(hex::encode_upper(bytes).as_bytes())?;
            out.write_all(b">")
        }
        Object::Array(items) => {
            out.write_all(b"[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.write_all(b" ")?;
                }
                write_object(out, item)?;
            }
            out.write_all(b"]")
        }
        Object::Dictionary(dict) => write_dictionary(out, dict, None),
        Object::Stream(stream) => {
            write_dictionary(out, &stream.dict, Some(stream.content.len()))?;
            out.write_all(b"\nstream\n")?;
            out.write_all(&stream.content)?;
            out.write_all(b"\nendstream")
        }
        Object::Reference(id) => write!(out, "{} {} R", id.0, id.1),
    }
}

/// `/Length` is always the actual content length, appended when missing
fn write_dictionary(out: &mut Vec<u8>, dict: &Dictionary, stream_len: Option<usize>) -> io::Result<()> {
    out.write_all(b"<<")?;
    let mut wrote_length = false;
    for (key, value) in dict.iter() {
        out.write_all(b" ")?;
        write_name(out, key)?;
        out.write_all(b" ")?;
        match stream_len {
            Some(len) if key.as_slice() == b"Length" => {
                write!(out, "{}", len)?;
                wrote_length = true;
            }
            _ => write_object(out, value)?,
        }
    }
    if let (Some(len), false) = (stream_len, wrote_length) {
        write!(out, " /Length {}", len)?;
    }
    out.write_all(b" >>")
}

fn write_name(out: &mut Vec<u8>, name: &[u8]) -> io::Result<()> {
    out.write_all(b"/")?;
    for &byte in name {
        let regular = (0x21..=0x7E).contains(&byte) && !b"()<>[]{}/%#".contains(&byte);
        if regular {
            out.write_all(&[byte])?;
        } else {
            write!(out, "#{:02X}", byte)?;
        }
    }
    Ok(())
}

fn write_literal(out: &mut Vec<u8>, bytes: &[u8]) -> io::Result<()> {
    out.write_all(b"(")?;
    for &byte in bytes {
        match byte {
            b'(' | b')' | b'\\' => out.write_all(&[b'\\', byte])?,
            b'\r' => out.write_all(b"\\r")?,
            b'\n' => out.write_all(b"\\n")?,
            other => out.write_all(&[other])?,
        }
    }
    out.write_all(b")")
}

/// Shortest round-trip decimal, never in exponent form
pub fn format_real(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "0".to_string();
    }
    format!("{}", value)
}
