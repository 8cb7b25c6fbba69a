//! Stream filter decoding for embedded file streams

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Document, Object, Stream};
use tracing::trace;

use crate::error::{Error, FilterError, Result};
use crate::pdf_document::{as_integer, lookup, resolve};

/// Filters understood by [`decode_stream`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFilter {
    Flate,
    Lzw,
    AsciiHex,
    Ascii85,
    RunLength,
}

impl StreamFilter {
    pub fn from_name(name: &[u8]) -> std::result::Result<Self, FilterError> {
        match name {
            b"FlateDecode" | b"Fl" => Ok(StreamFilter::Flate),
            b"LZWDecode" | b"LZW" => Ok(StreamFilter::Lzw),
            b"ASCIIHexDecode" | b"AHx" => Ok(StreamFilter::AsciiHex),
            b"ASCII85Decode" | b"A85" => Ok(StreamFilter::Ascii85),
            b"RunLengthDecode" | b"RL" => Ok(StreamFilter::RunLength),
            other => Err(FilterError::Unsupported(String::from_utf8_lossy(other).into_owned())),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            StreamFilter::Flate => "FlateDecode",
            StreamFilter::Lzw => "LZWDecode",
            StreamFilter::AsciiHex => "ASCIIHexDecode",
            StreamFilter::Ascii85 => "ASCII85Decode",
            StreamFilter::RunLength => "RunLengthDecode",
        }
    }

    fn corrupted(&self, reason: impl Into<String>) -> FilterError {
        FilterError::Corrupted {
            filter: self.label().to_string(),
            reason: reason.into(),
        }
    }
}

/// Applies the stream's declared `/Filter` chain to its content
pub fn decode_stream(doc: &Document, stream: &Stream) -> Result<Vec<u8>> {
    let filters = declared_filters(doc, &stream.dict)?;
    let mut data = stream.content.clone();
    for (index, filter) in filters.iter().enumerate() {
        let params = decode_params(doc, &stream.dict, index);
        trace!("applying {} to {} bytes", filter.label(), data.len());
        data = apply_filter(*filter, &data, params)?;
    }
    Ok(data)
}

fn declared_filters(doc: &Document, dict: &Dictionary) -> Result<Vec<StreamFilter>> {
    let names: Vec<&[u8]> = match lookup(doc, dict, b"Filter") {
        None | Some(Object::Null) => Vec::new(),
        Some(Object::Name(name)) => vec![name.as_slice()],
        Some(Object::Array(items)) => items
            .iter()
            .map(|item| match resolve(doc, item) {
                Some(Object::Name(name)) => Ok(name.as_slice()),
                _ => Err(FilterError::Unsupported("non-name /Filter entry".into())),
            })
            .collect::<std::result::Result<_, _>>()?,
        Some(_) => return Err(FilterError::Unsupported("non-name /Filter".into()).into()),
    };
    names
        .into_iter()
        .map(|n| StreamFilter::from_name(n).map_err(Error::from))
        .collect()
}

fn decode_params<'a>(doc: &'a Document, dict: &'a Dictionary, index: usize) -> Option<&'a Dictionary> {
    let params = lookup(doc, dict, b"DecodeParms").or_else(|| lookup(doc, dict, b"DP"))?;
    let entry = match params {
        Object::Array(items) => resolve(doc, items.get(index)?)?,
        other if index == 0 => other,
        _ => return None,
    };
    match entry {
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

fn param(params: Option<&Dictionary>, key: &[u8]) -> Option<i64> {
    params?.get(key).ok().and_then(as_integer)
}

pub fn apply_filter(filter: StreamFilter, data: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
    if let Some(predictor) = param(params, b"Predictor") {
        if predictor != 1 {
            return Err(FilterError::UnsupportedPredictor(predictor).into());
        }
    }
    let decoded = match filter {
        StreamFilter::Flate => inflate(data).map_err(|e| filter.corrupted(e))?,
        StreamFilter::Lzw => {
            let early_change = param(params, b"EarlyChange").unwrap_or(1) != 0;
            let mut decoder = if early_change {
                weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
            } else {
                weezl::decode::Decoder::new(weezl::BitOrder::Msb, 8)
            };
            decoder.decode(data).map_err(|e| filter.corrupted(e.to_string()))?
        }
        StreamFilter::AsciiHex => ascii_hex_decode(data).map_err(|e| filter.corrupted(e))?,
        StreamFilter::Ascii85 => ascii85_decode(data).map_err(|e| filter.corrupted(e))?,
        StreamFilter::RunLength => run_length_decode(data).map_err(|e| filter.corrupted(e))?,
    };
    Ok(decoded)
}

fn inflate(data: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let mut out = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut out).map_err(|e| e.to_string())?;
    Ok(out)
}

/// Zlib-compresses `data` for a `/FlateDecode` stream
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn ascii_hex_decode(data: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut pending: Option<u8> = None;
    for &byte in data {
        if byte == b'>' {
            break;
        }
        if byte.is_ascii_whitespace() {
            continue;
        }
        let nibble = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            other => return Err(format!("invalid hex digit 0x{:02x}", other)),
        };
        match pending.take() {
            Some(high) => out.push((high << 4) | nibble),
            None => pending = Some(nibble),
        }
    }
    if let Some(high) = pending {
        out.push(high << 4);
    }
    Ok(out)
}

fn ascii85_decode(data: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut len = 0;
    let body = data.strip_prefix(b"<~").unwrap_or(data);
    for &byte in body {
        match byte {
            b'~' => break,
            b'z' if len == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[len] = byte - b'!';
                len += 1;
                if len == 5 {
                    out.extend_from_slice(&ascii85_group(&group)?);
                    len = 0;
                }
            }
            b if b.is_ascii_whitespace() => {}
            other => return Err(format!("invalid ASCII85 byte 0x{:02x}", other)),
        }
    }
    if len == 1 {
        return Err("dangling single ASCII85 digit".into());
    }
    if len > 1 {
        for slot in group.iter_mut().skip(len) {
            *slot = b'u' - b'!';
        }
        let bytes = ascii85_group(&group)?;
        out.extend_from_slice(&bytes[..len - 1]);
    }
    Ok(out)
}

fn ascii85_group(group: &[u8; 5]) -> std::result::Result<[u8; 4], String> {
    let value = group
        .iter()
        .try_fold(0u64, |acc, digit| Some(acc * 85 + u64::from(*digit)))
        .filter(|v| *v <= u64::from(u32::MAX))
        .ok_or_else(|| "ASCII85 group overflows 32 bits".to_string())?;
    Ok((value as u32).to_be_bytes())
}

fn run_length_decode(data: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let length = data[i];
        i += 1;
        match length {
            128 => break,
            0..=127 => {
                let n = length as usize + 1;
                let chunk = data.get(i..i + n).ok_or("literal run past end of data")?;
                out.extend_from_slice(chunk);
                i += n;
            }
            _ => {
                let byte = *data.get(i).ok_or("repeat run past end of data")?;
                out.extend(std::iter::repeat(byte).take(257 - length as usize));
                i += 1;
            }
        }
    }
    Ok(out)
}
