//! Script metadata model and annotation parsing.
//!
//! A runnable script declares its metadata in a leading comment block:
//!
//! ```text
//! #!/bin/bash
//! # @name Greet
//! # @description Say hello to someone
//! # @category demo
//! # @param name {string} [required] Who to greet
//! # @param excited {boolean} Add an exclamation mark
//! ```
//!
//! Parsing stops at the first line that is neither a shebang nor a
//! comment. A script with no `@name` annotation falls back to its file
//! name; only *malformed* annotations reject a script.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Closed interpreter lookup keyed by file extension.
///
/// Adding a new script type is a change to this one table, not to the
/// execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptKind {
    Shell,
    Node,
    Python,
}

impl ScriptKind {
    /// Map a file extension to its interpreter kind.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str())? {
            "sh" => Some(Self::Shell),
            "js" | "mjs" => Some(Self::Node),
            "py" => Some(Self::Python),
            _ => None,
        }
    }

    /// The interpreter command used to run scripts of this kind.
    pub fn interpreter(self) -> &'static str {
        match self {
            Self::Shell => "bash",
            Self::Node => "node",
            Self::Python => "python3",
        }
    }

    /// The comment prefix that introduces annotation lines.
    fn comment_prefix(self) -> &'static str {
        match self {
            Self::Shell | Self::Python => "#",
            Self::Node => "//",
        }
    }
}

/// Where a script is meant to run: streamed in the terminal pane, or
/// opened by the browser instead of executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionContext {
    #[default]
    Terminal,
    Browser,
}

/// Declared type of one script parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    String,
    Number,
    Boolean,
    Select,
}

/// Declared shape of one input a script accepts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    /// Parameter name, unique within a descriptor.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterKind,
    pub required: bool,
    /// Human-readable help text shown in the UI form.
    pub description: String,
    /// Enumerated choice set; only meaningful for `select` parameters.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

/// Parsed metadata describing one runnable script.
///
/// Immutable once parsed; a catalog refresh supersedes descriptors
/// wholesale rather than editing them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDescriptor {
    pub name: String,
    pub description: String,
    pub category: String,
    pub context: ExecutionContext,
    /// Parameters in declaration order; binding is positional.
    pub params: Vec<ParameterSpec>,
    pub file_name: String,
    pub path: PathBuf,
    pub kind: ScriptKind,
}

/// Annotation parsing failure. Any of these rejects the whole script.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unsupported script extension: {0}")]
    UnsupportedExtension(String),
    #[error("malformed @param line: {0}")]
    MalformedParam(String),
    #[error("unknown parameter type: {0}")]
    UnknownKind(String),
    #[error("select parameter '{0}' has no choices")]
    EmptyChoices(String),
    #[error("required parameter '{0}' must not declare a default")]
    RequiredWithDefault(String),
}

/// Grammar of one `@param` line:
/// `@param <name> {<kind>[:c1,c2,...]} [required] [default:<v>] <help>`
static PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\S+)\s+\{([a-z]+)(?::([^}]+))?\}\s*(\[required\])?\s*(?:\[default:([^\]]*)\])?\s*(.*)$",
    )
    .expect("valid regex")
});

/// Parse a script's annotation block into a [`ScriptDescriptor`].
///
/// `source` is the full file contents; only the leading shebang/comment
/// block is examined.
pub fn parse_descriptor(path: &Path, source: &str) -> Result<ScriptDescriptor, ParseError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let kind = ScriptKind::from_path(path)
        .ok_or_else(|| ParseError::UnsupportedExtension(file_name.clone()))?;
    let prefix = kind.comment_prefix();

    let mut name = None;
    let mut description = String::new();
    let mut category = String::new();
    let mut context = ExecutionContext::default();
    let mut params = Vec::new();

    for (idx, line) in source.lines().enumerate() {
        let line = line.trim_start();
        if idx == 0 && line.starts_with("#!") {
            continue;
        }
        let Some(comment) = line.strip_prefix(prefix) else {
            break;
        };
        let comment = comment.trim();
        let Some(tag) = comment.strip_prefix('@') else {
            continue;
        };

        if let Some(rest) = tag.strip_prefix("name ") {
            name = Some(rest.trim().to_string());
        } else if let Some(rest) = tag.strip_prefix("description ") {
            description = rest.trim().to_string();
        } else if let Some(rest) = tag.strip_prefix("category ") {
            category = rest.trim().to_string();
        } else if let Some(rest) = tag.strip_prefix("context ") {
            if rest.trim() == "browser" {
                context = ExecutionContext::Browser;
            }
        } else if let Some(rest) = tag.strip_prefix("param ") {
            params.push(parse_param(rest.trim())?);
        }
    }

    Ok(ScriptDescriptor {
        name: name.unwrap_or_else(|| file_name.clone()),
        description,
        category,
        context,
        params,
        file_name,
        path: path.to_path_buf(),
        kind,
    })
}

/// Parse one `@param` annotation body and enforce the contract
/// invariants: a select parameter must carry choices, and a required
/// parameter must not carry a default.
fn parse_param(body: &str) -> Result<ParameterSpec, ParseError> {
    let caps = PARAM_RE
        .captures(body)
        .ok_or_else(|| ParseError::MalformedParam(body.to_string()))?;

    let name = caps[1].to_string();
    let kind = match &caps[2] {
        "string" => ParameterKind::String,
        "number" => ParameterKind::Number,
        "boolean" => ParameterKind::Boolean,
        "select" => ParameterKind::Select,
        other => return Err(ParseError::UnknownKind(other.to_string())),
    };
    let choices: Vec<String> = caps
        .get(3)
        .map(|m| {
            m.as_str()
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let required = caps.get(4).is_some();
    let default = caps.get(5).map(|m| parse_default(m.as_str().trim()));
    let description = caps[6].trim().to_string();

    if kind == ParameterKind::Select && choices.is_empty() {
        return Err(ParseError::EmptyChoices(name));
    }
    if required && default.is_some() {
        return Err(ParseError::RequiredWithDefault(name));
    }

    Ok(ParameterSpec {
        name,
        kind,
        required,
        description,
        choices,
        default,
    })
}

/// Interpret a default value as JSON where possible (`true`, `42`), else
/// as a plain string.
fn parse_default(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn parse(file_name: &str, source: &str) -> Result<ScriptDescriptor, ParseError> {
        parse_descriptor(Path::new(file_name), source)
    }

    #[test]
    fn parses_full_annotation_block() {
        let desc = parse(
            "greet.sh",
            "#!/bin/bash\n\
             # @name Greet\n\
             # @description Say hello\n\
             # @category demo\n\
             # @param name {string} [required] Who to greet\n\
             # @param excited {boolean} Add an exclamation mark\n\
             echo hi\n",
        )
        .expect("parse");

        assert_eq!(desc.name, "Greet");
        assert_eq!(desc.description, "Say hello");
        assert_eq!(desc.category, "demo");
        assert_eq!(desc.kind, ScriptKind::Shell);
        assert_eq!(desc.context, ExecutionContext::Terminal);
        assert_eq!(desc.params.len(), 2);
        assert_eq!(desc.params[0].name, "name");
        assert_eq!(desc.params[0].kind, ParameterKind::String);
        assert!(desc.params[0].required);
        assert_eq!(desc.params[0].description, "Who to greet");
        assert_eq!(desc.params[1].name, "excited");
        assert_eq!(desc.params[1].kind, ParameterKind::Boolean);
        assert!(!desc.params[1].required);
    }

    #[test]
    fn name_falls_back_to_file_name() {
        let desc = parse("cleanup.sh", "#!/bin/bash\necho hi\n").expect("parse");
        assert_eq!(desc.name, "cleanup.sh");
        assert!(desc.params.is_empty());
    }

    #[test]
    fn parsing_stops_at_first_code_line() {
        let desc = parse(
            "late.sh",
            "#!/bin/bash\necho hi\n# @param ignored {string} too late\n",
        )
        .expect("parse");
        assert!(desc.params.is_empty());
    }

    #[test]
    fn node_scripts_use_slash_comments() {
        let desc = parse(
            "open-docs.js",
            "// @name Open Docs\n// @context browser\nconsole.log('hi');\n",
        )
        .expect("parse");
        assert_eq!(desc.name, "Open Docs");
        assert_eq!(desc.kind, ScriptKind::Node);
        assert_eq!(desc.context, ExecutionContext::Browser);
    }

    #[test]
    fn select_param_parses_choices() {
        let desc = parse(
            "deploy.sh",
            "# @param env {select:dev,staging,prod} [required] Target environment\n",
        )
        .expect("parse");
        assert_eq!(desc.params[0].kind, ParameterKind::Select);
        assert_eq!(desc.params[0].choices, vec!["dev", "staging", "prod"]);
    }

    #[test]
    fn select_without_choices_is_rejected() {
        let err = parse("bad.sh", "# @param env {select} Pick one\n").unwrap_err();
        assert_matches!(err, ParseError::EmptyChoices(name) if name == "env");
    }

    #[test]
    fn required_with_default_is_rejected() {
        let err = parse(
            "bad.sh",
            "# @param count {number} [required] [default:3] How many\n",
        )
        .unwrap_err();
        assert_matches!(err, ParseError::RequiredWithDefault(name) if name == "count");
    }

    #[test]
    fn default_values_parse_as_json() {
        let desc = parse(
            "defaults.sh",
            "# @param count {number} [default:3] How many\n\
             # @param label {string} [default:latest] Tag label\n",
        )
        .expect("parse");
        assert_eq!(desc.params[0].default, Some(serde_json::json!(3)));
        assert_eq!(
            desc.params[1].default,
            Some(serde_json::Value::String("latest".into()))
        );
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = parse("bad.sh", "# @param x {blob} Something\n").unwrap_err();
        assert_matches!(err, ParseError::UnknownKind(kind) if kind == "blob");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = parse("notes.txt", "# @name Notes\n").unwrap_err();
        assert_matches!(err, ParseError::UnsupportedExtension(_));
    }

    #[test]
    fn descriptor_serializes_camel_case() {
        let desc = parse(
            "greet.sh",
            "# @name Greet\n# @param name {string} [required] Who\n",
        )
        .expect("parse");
        let json = serde_json::to_value(&desc).expect("serialize");
        assert_eq!(json["fileName"], "greet.sh");
        assert_eq!(json["params"][0]["type"], "string");
        assert_eq!(json["context"], "terminal");
    }
}
