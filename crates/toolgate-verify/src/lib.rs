//! # toolgate-verify
//!
//! Argument checks that sit on either side of the toolgate pipeline.
//!
//! - [`SchemaValidator`] implements `ArgumentValidator`: call arguments are
//!   validated against the tool's declared JSON Schema via the `jsonschema`
//!   crate before any policy is consulted.
//! - [`FieldMasker`] implements `Redactor`: sensitive argument values are
//!   replaced before the decision record reaches the audit log.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use toolgate_verify::{FieldMasker, SchemaValidator};
//!
//! let validator = SchemaValidator::new();
//! let masker = FieldMasker::new(["body", "password"]);
//! ```

pub mod engine;
pub mod mask;

pub use engine::SchemaValidator;
pub use mask::{FieldMasker, REDACTED};

// ── Tests ─────────────────────────────────────────────────────────────────────
