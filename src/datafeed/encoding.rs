//! Character set detection and transcoding.
//!
//! The XML reader only understands UTF-8, so payloads are decoded up front
//! using the byte-order mark or the `encoding` attribute of the XML
//! declaration, and the declaration is rewritten to match the new encoding.

use encoding_rs::{Encoding, UTF_8};
use tracing::debug;

use super::xml_parser::ParseError;
use crate::constants::feed::{FALLBACK_ENCODING, PROLOG_SNIFF_LEN};

/// Decodes `data` into UTF-8 text with a UTF-8 declaration
pub fn decode_to_utf8(data: &[u8]) -> Result<String, ParseError> {
    let (encoding, body) = match Encoding::for_bom(data) {
        Some((encoding, bom_len)) => (encoding, &data[bom_len..]),
        None => (sniff_declared_encoding(data)?, data),
    };

    debug!("Decoding feed as {}", encoding.name());

    let text = encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| {
            ParseError::Encoding(format!("payload is not valid {}", encoding.name()))
        })?;

    if encoding == UTF_8 {
        return Ok(text.into_owned());
    }

    Ok(rewrite_declared_encoding(&text))
}

/// Reads the `encoding` pseudo-attribute from the XML declaration, if any
fn sniff_declared_encoding(data: &[u8]) -> Result<&'static Encoding, ParseError> {
    let head = &data[..data.len().min(PROLOG_SNIFF_LEN)];
    let head = String::from_utf8_lossy(head);

    let label = match declared_label(&head) {
        Some(label) => label,
        None => FALLBACK_ENCODING.to_string(),
    };

    Encoding::for_label(label.as_bytes())
        .ok_or_else(|| ParseError::Encoding(format!("unsupported encoding '{label}'")))
}

fn declared_label(head: &str) -> Option<String> {
    if !head.trim_start().starts_with("<?xml") {
        return None;
    }

    let declaration = &head[..head.find("?>")?];
    let value = &declaration[declaration.find("encoding")? + "encoding".len()..];
    let value = value.trim_start().strip_prefix('=')?.trim_start();

    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &value[1..];
    let end = value.find(quote)?;

    Some(value[..end].to_string())
}

fn rewrite_declared_encoding(text: &str) -> String {
    let declaration_end = match text.find("?>") {
        Some(end) if text.trim_start().starts_with("<?xml") => end,
        _ => return text.to_string(),
    };

    match declared_label(text) {
        Some(label) => {
            let declaration = &text[..declaration_end];
            let rest = &text[declaration_end..];
            let patched = declaration
                .replacen(&format!("\"{label}\""), "\"UTF-8\"", 1)
                .replacen(&format!("'{label}'"), "'UTF-8'", 1);
            format!("{patched}{rest}")
        }
        None => text.to_string(),
    }
}
