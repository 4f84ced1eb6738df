//! Parameter binding: validate a caller-supplied parameter mapping
//! against a script's declared contract and render it into a positional
//! argument list.
//!
//! Pure validation + transformation; no side effects. Arguments are
//! strictly positional, in descriptor declaration order -- there is no
//! support for named or flagged arguments at this layer.

use serde_json::Value;

use crate::script::ScriptDescriptor;

/// Validation failure reported before any process is spawned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("missing required parameter: {0}")]
    MissingRequiredParameter(String),
}

/// Render `raw` into an argument list in descriptor parameter order.
///
/// For each declared parameter: a present value is stringified and
/// appended; an absent optional value contributes nothing (no
/// placeholder); an absent required value fails the whole binding.
/// Null and empty-string values count as absent.
pub fn bind(
    descriptor: &ScriptDescriptor,
    raw: &serde_json::Map<String, Value>,
) -> Result<Vec<String>, BindError> {
    let mut args = Vec::new();
    for spec in &descriptor.params {
        match raw.get(&spec.name) {
            Some(value) if !is_absent(value) => args.push(render(value)),
            _ if spec.required => {
                return Err(BindError::MissingRequiredParameter(spec.name.clone()));
            }
            _ => {}
        }
    }
    Ok(args)
}

fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Stringify a raw value: booleans render as `true`/`false`, numbers in
/// their textual form, strings as-is.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
