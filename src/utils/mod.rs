//! Utility functions and helpers

pub mod certificates;

pub use certificates::{
    load_client_identity, load_trust_anchor, CertificateInfo, CertificateResolver,
    ClientIdentity,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Source encodings tried in order when normalizing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Ascii,
    Utf8,
    Latin1,
}

/// Detect the encoding of `input`: ASCII, then UTF-8, then ISO-8859-1.
///
/// Latin-1 maps every byte to a code point, so detection always succeeds.
pub fn detect_encoding(input: &[u8]) -> SourceEncoding {
    if input.is_ascii() {
        SourceEncoding::Ascii
    } else if std::str::from_utf8(input).is_ok() {
        SourceEncoding::Utf8
    } else {
        SourceEncoding::Latin1
    }
}

/// Convert `input` to UTF-8 text from its detected source encoding.
pub fn normalize_text(input: &[u8]) -> String {
    match detect_encoding(input) {
        SourceEncoding::Ascii | SourceEncoding::Utf8 => {
            String::from_utf8_lossy(input).into_owned()
        }
        SourceEncoding::Latin1 => input.iter().map(|&byte| char::from(byte)).collect(),
    }
}

/// Base64-encode a payload and normalize the encoding for the XML envelope.
pub fn encode_payload(data: &[u8]) -> String {
    normalize_text(STANDARD.encode(data).as_bytes())
}

/// Mask a personal number for log output, keeping the birth date part.
pub fn mask_personal_number(personal_number: &str) -> String {
    let visible: String = personal_number.chars().take(8).collect();
    let hidden = personal_number.chars().count().saturating_sub(8);
    format!("{visible}{}", "*".repeat(hidden))
}
