//! Notice text: placeholder filling, line composition and word-wrapped
//! Helvetica layout for the appended page

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use lopdf::content::Operation;
use lopdf::{Object, StringFormat};
use regex::Regex;
use tracing::warn;

use crate::config::PresentationConfig;
use crate::error::PresentationError;
use crate::pdf_document::name;

use super::PresentationSpec;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap();
}

/// Helvetica advance widths for 0x20..=0x7E, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // space to /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0 to ?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @ to O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P to _
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // ` to o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p to ~
];

const FALLBACK_WIDTH: u16 = 556;

/// Wrapped notice lines positioned on a page
#[derive(Debug, Clone, PartialEq)]
pub struct NoticeLayout {
    pub lines: Vec<String>,
    pub x: i64,
    /// Baseline of the first line
    pub top: i64,
    pub font_size: i64,
    pub leading: i64,
}

impl NoticeLayout {
    /// Baseline of the last line, or `top` when there is no text
    pub fn bottom(&self) -> i64 {
        self.top - self.leading * self.lines.len().saturating_sub(1) as i64
    }

    /// Text operators drawing every line with `font`
    pub fn operations(&self, font: &str) -> Vec<Operation> {
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![name(font), Object::Integer(self.font_size)]),
            Operation::new("TL", vec![Object::Integer(self.leading)]),
            Operation::new("Td", vec![Object::Integer(self.x), Object::Integer(self.top)]),
        ];
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                ops.push(Operation::new("T*", vec![]));
            }
            if !line.is_empty() {
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(line), StringFormat::Literal)],
                ));
            }
        }
        ops.push(Operation::new("ET", vec![]));
        ops
    }
}

#[derive(Debug, Clone)]
pub struct NoticeRenderer {
    config: PresentationConfig,
}

impl NoticeRenderer {
    pub fn new(config: &PresentationConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Fills the notice template. Built-in `address` and `profile_url` take
    /// precedence over caller substitutions.
    pub fn fill(&self, spec: &PresentationSpec) -> Result<String, PresentationError> {
        let template = spec.notice_text.as_deref().unwrap_or(&self.config.default_notice);
        let mut values: BTreeMap<&str, String> =
            spec.substitutions.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
        values.insert("address", spec.payment_address.clone());
        values.insert("profile_url", self.profile_url(&spec.payment_address));
        fill_template(template, &values)
    }

    pub fn profile_url(&self, address: &str) -> String {
        format!("{}{}", self.config.profile_base_url, urlencoding::encode(address))
    }

    /// Notice, then the donation breakdown, then the publisher notes
    pub fn compose_lines(&self, spec: &PresentationSpec) -> Result<Vec<String>, PresentationError> {
        let notice = self.fill(spec)?;
        let mut lines: Vec<String> = notice.lines().map(str::to_string).collect();

        if let Some(split) = spec.donation_split.as_ref().filter(|s| !s.is_empty()) {
            lines.push(String::new());
            for share in split {
                lines.push(format!("{}: {}%", share.label, share.percentage));
            }
        }
        if let Some(notes) = spec.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            lines.push(String::new());
            lines.push("Publisher notes:".to_string());
            lines.extend(notes.lines().map(str::to_string));
        }
        Ok(lines)
    }

    /// Wraps `lines` to the page width and places them from the top margin
    /// down, keeping `reserved_bottom` points above the bottom margin free
    pub fn layout(&self, lines: &[String], page_width: f64, page_height: f64, reserved_bottom: i64) -> NoticeLayout {
        let font_size = f64::from(self.config.font_size);
        let margin = f64::from(self.config.margin);
        let leading = i64::from(self.config.leading);
        let max_width = (page_width - 2.0 * margin).max(font_size);

        let mut wrapped: Vec<String> = lines.iter().flat_map(|l| wrap_line(l, max_width, font_size)).collect();
        let top = self.text_top(page_height);
        let room = top - i64::from(self.config.margin) - reserved_bottom.max(0);
        let fit = (room.div_euclid(leading.max(1)) + 1).max(0) as usize;
        if wrapped.len() > fit {
            warn!("notice needs {} lines, only {} fit on the page", wrapped.len(), fit);
            wrapped.truncate(fit);
        }

        NoticeLayout {
            lines: wrapped,
            x: i64::from(self.config.margin),
            top,
            font_size: i64::from(self.config.font_size),
            leading,
        }
    }

    /// Baseline of the first notice line on a page of `page_height`
    pub fn text_top(&self, page_height: f64) -> i64 {
        (page_height - f64::from(self.config.margin)).round() as i64
    }
}

/// Replaces every `{{name}}` with its value. Unknown names and stray braces are errors.
pub fn fill_template(template: &str, values: &BTreeMap<&str, String>) -> Result<String, PresentationError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_literal(&mut out, &template[last..whole.start()])?;
        let value = values
            .get(key.as_str())
            .ok_or_else(|| PresentationError::UnknownPlaceholder(key.as_str().to_string()))?;
        out.push_str(value);
        last = whole.end();
    }
    push_literal(&mut out, &template[last..])?;
    Ok(out)
}

fn push_literal(out: &mut String, segment: &str) -> Result<(), PresentationError> {
    if let Some(pos) = segment.find("{{").or_else(|| segment.find("}}")) {
        let snippet: String = segment[pos..].chars().take(24).collect();
        return Err(PresentationError::InvalidTemplate(format!("unbalanced braces at '{}'", snippet)));
    }
    out.push_str(segment);
    Ok(())
}

fn char_width(c: char, font_size: f64) -> f64 {
    let units = match c as u32 {
        code @ 0x20..=0x7E => HELVETICA_WIDTHS[(code - 0x20) as usize],
        _ => FALLBACK_WIDTH,
    };
    f64::from(units) * font_size / 1000.0
}

fn text_width(text: &str, font_size: f64) -> f64 {
    text.chars().map(|c| char_width(c, font_size)).sum()
}

/// Greedy word wrap; words wider than a line are broken between characters
fn wrap_line(line: &str, max_width: f64, font_size: f64) -> Vec<String> {
    if line.trim().is_empty() {
        return vec![String::new()];
    }
    let space = char_width(' ', font_size);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut width = 0.0;

    for word in line.split_whitespace() {
        let word_width = text_width(word, font_size);
        let gap = if current.is_empty() { 0.0 } else { space };
        if width + gap + word_width <= max_width {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            width += gap + word_width;
            continue;
        }
        if !current.is_empty() {
            out.push(std::mem::take(&mut current));
            width = 0.0;
        }
        if word_width <= max_width {
            current.push_str(word);
            width = word_width;
            continue;
        }
        for c in word.chars() {
            let w = char_width(c, font_size);
            if width + w > max_width && !current.is_empty() {
                out.push(std::mem::take(&mut current));
                width = 0.0;
            }
            current.push(c);
            width += w;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Encodes text for a WinAnsiEncoding font; unmappable characters become '?'
/// where lopdf's own encoder would drop them from the line.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => b'?',
        })
        .collect()
}
