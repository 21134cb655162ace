//! # FolioDB Codec
//!
//! Document value model and JSON codec for FolioDB.
//!
//! This crate provides:
//! - [`Value`], the tagged variant type for document field values
//! - [`Document`], an ordered field-to-value mapping
//! - JSON serialization and deserialization with the numeric round-trip
//!   rules the engine relies on (integers that fit `i64` decode as
//!   [`Value::Integer`], everything else as [`Value::Float`])
//!
//! The codec is pure: it never touches the filesystem.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod json;
mod value;

pub use document::{Document, ID_FIELD};
pub use error::{CodecError, CodecResult};
pub use json::{from_slice, to_vec, to_vec_pretty};
pub use value::Value;
