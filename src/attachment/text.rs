//! PDF text-string decoding for name-tree keys and file names

/// PDFDocEncoding code points for 0x80..=0xA0 where it departs from Latin-1
const PDF_DOC_HIGH: [char; 33] = [
    '\u{2022}', '\u{2020}', '\u{2021}', '\u{2026}', '\u{2014}', '\u{2013}', '\u{0192}', '\u{2044}',
    '\u{2039}', '\u{203A}', '\u{2212}', '\u{2030}', '\u{201E}', '\u{201C}', '\u{201D}', '\u{2018}',
    '\u{2019}', '\u{201A}', '\u{2122}', '\u{FB01}', '\u{FB02}', '\u{0141}', '\u{0152}', '\u{0160}',
    '\u{0178}', '\u{017D}', '\u{0131}', '\u{0142}', '\u{0153}', '\u{0161}', '\u{017E}', '\u{FFFD}',
    '\u{20AC}',
];

/// Decodes a PDF text string.
///
/// UTF-16BE and UTF-8 byte-order marks are honored. Without a marker the
/// bytes are taken as UTF-8 when they form valid sequences (every lead byte
/// followed by the right number of continuation bytes), and as
/// PDFDocEncoding otherwise.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = rest.chunks_exact(2).map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        return char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => bytes.iter().map(|b| pdf_doc_char(*b)).collect(),
    }
}

fn pdf_doc_char(byte: u8) -> char {
    match byte {
        0x80..=0xA0 => PDF_DOC_HIGH[(byte - 0x80) as usize],
        0xAD => '\u{FFFD}',
        other => other as char,
    }
}

/// Encodes a text string: printable ASCII stays as-is, anything else is
/// written as UTF-16BE with a byte-order mark.
pub fn encode_text_string(value: &str) -> Vec<u8> {
    if value.bytes().all(|b| (0x20..0x7F).contains(&b)) {
        return value.as_bytes().to_vec();
    }
    let mut out = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ascii_name() {
        assert_eq!(decode_text_string(b"proof.json"), "proof.json");
    }

    #[test]
    fn test_utf16_with_bom() {
        let bytes = [0xFE, 0xFF, 0x00, b'p', 0x00, 0xE9, 0xD8, 0x3D, 0xDE, 0x00];
        assert_eq!(decode_text_string(&bytes), "p\u{e9}\u{1F600}");
    }

    #[test]
    fn test_multibyte_utf8_without_bom() {
        // Two-byte and three-byte sequences
        let name = "pr\u{f6}of-\u{20AC}.json";
        assert_eq!(decode_text_string(name.as_bytes()), name);
    }

    #[test]
    fn test_broken_continuation_falls_back_to_pdf_doc() {
        // 0xC3 announces a two-byte sequence but 0x28 is not a continuation byte
        let bytes = [b'a', 0xC3, 0x28];
        assert_eq!(decode_text_string(&bytes), "a\u{c3}(");
        assert_eq!(decode_text_string(&[0x80, 0x92]), "\u{2022}\u{2122}");
    }

    #[test]
    fn test_encode_chooses_utf16_for_non_ascii() {
        assert_eq!(encode_text_string("proof.json"), b"proof.json".to_vec());
        let encoded = encode_text_string("pr\u{f6}of");
        assert_eq!(&encoded[..2], &[0xFE, 0xFF]);
        assert_eq!(decode_text_string(&encoded), "pr\u{f6}of");
    }

    proptest! {
        #[test]
        fn prop_encoded_names_decode(name in "\\PC{1,24}") {
            prop_assert_eq!(decode_text_string(&encode_text_string(&name)), name);
        }

        #[test]
        fn prop_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = decode_text_string(&bytes);
        }
    }
}
