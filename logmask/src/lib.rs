//! Field-name based masking for structured log records.
//!
//! This crate separates:
//! - **What is sensitive**: a case-insensitive set of field names
//!   ([`SensitiveFieldSet`]).
//! - **How it is hidden**: a fixed, shared mask token ([`MaskToken`]) written
//!   over the value of every matching field, at any nesting depth.
//!
//! The masking itself is a pure walk over [`StructuredValue`] performed by
//! [`Masker`]. [`RedactingEncoder`] plugs that walk into a record encoder: it
//! masks scalar fields up front and wraps complex ones in a [`PendingMask`]
//! so the walk happens only when the wrapped encoder actually writes them.
//!
//! What this crate does:
//! - match field names, never field contents
//! - preserve keys, key spelling, array order and field order
//! - provide a `slog` drain decorator behind the `slog` feature
//!
//! What it does not do:
//! - route, filter by level, or write records anywhere
//! - inspect strings or bytes that were formatted before reaching it
//!
//! ```
//! use logmask::{Masker, SensitiveFieldSet, StructuredValue};
//! use serde_json::json;
//!
//! let masker = Masker::new(SensitiveFieldSet::new(["password"]));
//! let value = StructuredValue::from(json!({"user": "ada", "Password": "hunter2"}));
//! let masked = masker.mask(&value).unwrap();
//! assert_eq!(masked.to_json().unwrap(), json!({"user": "ada", "Password": "***"}));
//! ```

// <https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html>
#![warn(
    anonymous_parameters,
    bare_trait_objects,
    elided_lifetimes_in_paths,
    missing_copy_implementations,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces
)]
// <https://rust-lang.github.io/rust-clippy/stable>
#![warn(
    clippy::all,
    clippy::cargo,
    clippy::dbg_macro,
    clippy::float_cmp_const,
    clippy::get_unwrap,
    clippy::mem_forget,
    clippy::nursery,
    clippy::pedantic,
    clippy::todo,
    clippy::unwrap_used,
    clippy::uninlined_format_args
)]
// Allow some clippy lints
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::cargo_common_metadata,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::option_if_let_else
)]
// Allow some lints while testing
#![cfg_attr(test, allow(clippy::non_ascii_literal, clippy::unwrap_used))]

pub mod config;
pub mod encoder;
mod error;
mod fields;
mod masker;
mod pending;
#[cfg(feature = "slog")]
pub mod slog;
mod token;
mod value;

pub use config::RedactionConfig;
pub use encoder::{
    ENCODE_ERROR_KEY, Encoder, Entry, Field, FieldValue, JsonEncoder, JsonKeys, Level,
    RedactingEncoder, Redactor,
};
pub use error::{EncodeError, RedactError};
pub use fields::SensitiveFieldSet;
pub use masker::{DEFAULT_MAX_DEPTH, Masker, OnMaskFailure};
pub use pending::PendingMask;
#[cfg(feature = "slog")]
pub use crate::slog::{DrainError, RedactingDrain};
pub use token::{DEFAULT_MASK_TOKEN, MaskToken};
pub use value::{Canonical, Scalar, StructuredValue};
