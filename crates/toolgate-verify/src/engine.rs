//! Schema-based argument validator.
//!
//! `SchemaValidator` implements the `ArgumentValidator` trait from
//! `toolgate-core`. Arguments are validated against the tool's declared JSON
//! Schema with the `jsonschema` crate. All failures are collected before
//! returning so the deny reason names every problem in one pass.
//!
//! Failure messages are built from the schema side of each error (keyword,
//! limit, property name) and never quote the offending argument value. The
//! deny reason is written to the audit log verbatim, after argument masking
//! has already happened.
//!
//! Compiled validators are cached by schema text. `with_schemas` compiles a
//! registry's schemas up front so `authorize` never pays for compilation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use jsonschema::{
    error::{TypeKind, ValidationErrorKind},
    ValidationError, Validator,
};
use serde_json::Value;
use tracing::{debug, warn};

use toolgate_contracts::{
    error::{GateError, GateResult},
    verify::{ValidationFailure, ValidationReport},
};
use toolgate_core::traits::ArgumentValidator;

/// Validates call arguments against JSON Schema documents.
#[derive(Debug, Default, Clone)]
pub struct SchemaValidator {
    compiled: Arc<RwLock<HashMap<String, Arc<Validator>>>>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A validator with `schemas` already compiled.
    ///
    /// Schemas that fail to compile are skipped here; they are reported as a
    /// validation failure on the first call that uses them.
    pub fn with_schemas<'a, I>(schemas: I) -> Self
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let validator = Self::new();
        let mut compiled = 0usize;
        for schema in schemas {
            if schema.is_null() {
                continue;
            }
            if matches!(validator.compile(schema), Ok(Ok(_))) {
                compiled += 1;
            }
        }
        debug!(compiled, "argument schemas precompiled");
        validator
    }

    /// Number of distinct schemas compiled so far.
    pub fn cached(&self) -> usize {
        self.compiled.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Fetch or compile the validator for `schema`. The inner `Err` carries
    /// the compilation message.
    fn compile(&self, schema: &Value) -> GateResult<Result<Arc<Validator>, String>> {
        let key = schema.to_string();

        if let Some(found) = self.read()?.get(&key) {
            return Ok(Ok(Arc::clone(found)));
        }

        match jsonschema::validator_for(schema) {
            Ok(validator) => {
                let validator = Arc::new(validator);
                self.write()?.insert(key, Arc::clone(&validator));
                Ok(Ok(validator))
            }
            Err(e) => Ok(Err(format!("invalid JSON Schema document: {e}"))),
        }
    }

    fn read(&self) -> GateResult<std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Validator>>>> {
        self.compiled.read().map_err(|_| GateError::StorageError {
            reason: "schema cache lock poisoned".to_string(),
        })
    }

    fn write(&self) -> GateResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Validator>>>> {
        self.compiled.write().map_err(|_| GateError::StorageError {
            reason: "schema cache lock poisoned".to_string(),
        })
    }
}

impl ArgumentValidator for SchemaValidator {
    /// Validate `arguments` against `schema`.
    ///
    /// A null schema means "no constraint". A schema that does not compile
    /// is reported as a failure rather than an error, so the call is denied
    /// and audited instead of aborting the pipeline.
    fn validate(&self, arguments: &Value, schema: &Value) -> GateResult<ValidationReport> {
        if schema.is_null() {
            return Ok(ValidationReport::pass());
        }

        let validator = match self.compile(schema)? {
            Ok(validator) => validator,
            Err(message) => {
                warn!(%message, "schema compilation failure");
                return Ok(ValidationReport {
                    passed: false,
                    failures: vec![ValidationFailure {
                        path: String::new(),
                        message,
                    }],
                });
            }
        };

        let failures: Vec<ValidationFailure> = validator
            .iter_errors(arguments)
            .map(|error| ValidationFailure {
                path: error.instance_path.to_string(),
                message: describe(&error),
            })
            .collect();

        if !failures.is_empty() {
            warn!(failures = failures.len(), "argument schema violation");
        }

        Ok(ValidationReport {
            passed: failures.is_empty(),
            failures,
        })
    }
}

/// Describe `error` from the schema alone, without the instance value.
fn describe(error: &ValidationError<'_>) -> String {
    match &error.kind {
        ValidationErrorKind::Required { property } => match property.as_str() {
            Some(name) => format!("missing required property '{name}'"),
            None => "missing required property".to_string(),
        },
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            format!("unexpected properties: {}", unexpected.join(", "))
        }
        ValidationErrorKind::Type {
            kind: TypeKind::Single(expected),
        } => format!("expected type {expected}"),
        ValidationErrorKind::MinLength { limit } => format!("shorter than {limit} characters"),
        ValidationErrorKind::MaxLength { limit } => format!("longer than {limit} characters"),
        ValidationErrorKind::Minimum { limit } => format!("less than the minimum of {limit}"),
        ValidationErrorKind::Maximum { limit } => format!("greater than the maximum of {limit}"),
        ValidationErrorKind::Format { format } => format!("not a valid '{format}'"),
        _ => {
            let schema_path = error.schema_path.to_string();
            let keyword = schema_path.rsplit('/').next().unwrap_or_default();
            if keyword.is_empty() {
                "does not satisfy the schema".to_string()
            } else {
                format!("does not satisfy the '{keyword}' constraint")
            }
        }
    }
}
