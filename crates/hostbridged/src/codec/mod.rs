//! Hand-written codec for the bridge's JSON-like payloads.
//!
//! The codec is tolerant rather than validating. [`decode_map`] returns an
//! empty map for anything that is not an object and skips members without a
//! colon, while [`decode_value`] falls back to the raw text as a string when a
//! token is not a recognised literal. Neither function fails. Known limits:
//! duplicate keys collapse to the last occurrence, numbers that overflow `i64`
//! decode as floats, unbalanced brackets are read up to the end of input, and
//! containers nested deeper than [`MAX_DEPTH`] stay as raw text.
//!
//! Encoding always produces valid JSON: maps keep insertion order, integral
//! floats keep a trailing `.0` so they decode back as floats, and non-finite
//! floats are written as `null`.

mod decode;
mod encode;
mod value;

pub use decode::{MAX_DEPTH, decode_map, decode_value};
pub use encode::encode;
pub use value::{Map, Number, Value};
