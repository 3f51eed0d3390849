//! Helpers shared across the crate.
//!
//! - Text escaping for the tab-delimited layer format: descriptive names are
//!   made safe to embed as a single field, annotation values are URL-encoded.
//! - File-name safe encoding of dataset/version/layer names.
//! - Macros for builder-style `with_*` methods and getters.
//! - Wall-clock helpers used for layer modification stamps.

use std::borrow::Cow;
use std::time::{
    SystemTime,
    UNIX_EPOCH,
};

/// Punctuation kept verbatim in descriptive names.
pub const NAME_ALLOWED_PUNCT: &str = "-_.:,;=+()[]{}|/!?*#@&~^$'";

/// Escapes a descriptive name so it fits in one tab-delimited field.
///
/// Spaces become underscores; ASCII alphanumerics and
/// [`NAME_ALLOWED_PUNCT`] are kept; every other character is written as
/// `%XX` per UTF-8 byte.
pub fn encode_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == ' ' {
            out.push('_');
        }
        else if c.is_ascii_alphanumeric() || NAME_ALLOWED_PUNCT.contains(c) {
            out.push(c);
        }
        else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).as_bytes() {
                out.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    out
}

/// Reverses the percent escapes of [`encode_name`]. Invalid UTF-8 produced
/// by stray escapes is replaced rather than rejected.
pub fn decode_name(encoded: &str) -> String {
    let bytes = urlencoding::decode_binary(encoded.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// URL-encodes an annotation value.
pub fn encode_value(raw: &str) -> Cow<'_, str> {
    urlencoding::encode(raw)
}

/// Decodes an annotation value, accepting `+` for space as form encoders
/// write it.
pub fn decode_value(encoded: &str) -> String {
    let spaced = encoded.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Encodes a user-supplied name for use as part of a file name.
pub fn encode_file_component(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// Milliseconds since the Unix epoch.
pub fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[macro_export]
macro_rules! getter_fn {
    ($field_name: ident, $field_type: ty) => {
        pub fn $field_name(&self) -> &$field_type {
            &self.$field_name
        }
    };
    ($field_name:ident, mut $field_type:ty) => {
        paste::paste! {
            pub fn [<$field_name _mut>](&mut self) -> &mut $field_type {
                &mut self.$field_name
            }
        }
    };
}

#[macro_export]
macro_rules! with_field_fn {
    ($field_name: ident, $field_type: ty) => {
        paste::paste! {
            pub fn [<with_$field_name>](mut self, value: $field_type) -> Self {
                self.$field_name = value;
                self
            }
        }
    };
}

#[cfg(test)]
mod tests;
