//! Field masking for audited arguments.

use std::collections::HashSet;

use serde_json::Value;

use toolgate_core::traits::Redactor;

/// The value written in place of a masked field.
pub const REDACTED: &str = "[REDACTED]";

/// Replaces the values of configured keys, at any depth, with `"[REDACTED]"`.
///
/// Keys are matched case-insensitively. Arrays are walked element by element.
#[derive(Debug, Default, Clone)]
pub struct FieldMasker {
    fields: HashSet<String>,
}

impl FieldMasker {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|f| f.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn is_masked(&self, key: &str) -> bool {
        self.fields.contains(&key.to_ascii_lowercase())
    }

    fn mask(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, v) in map.iter_mut() {
                    if self.is_masked(key) {
                        *v = Value::String(REDACTED.to_string());
                    } else {
                        self.mask(v);
                    }
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|v| self.mask(v)),
            _ => {}
        }
    }
}

impl Redactor for FieldMasker {
    fn redact(&self, arguments: &Value) -> Value {
        let mut out = arguments.clone();
        if !self.fields.is_empty() {
            self.mask(&mut out);
        }
        out
    }
}
