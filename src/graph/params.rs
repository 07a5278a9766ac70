use serde::{Deserialize, Serialize};
use std::fmt;

/// The declared type of a node parameter.
///
/// Serialized as its exact textual form (`"string"`, `"object[]"`, ...) so that
/// types the toolkit does not know about survive a load/save cycle untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Object,
    StringList,
    ObjectList,
    Other(String),
}

impl ParamType {
    pub fn as_str(&self) -> &str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::StringList => "string[]",
            ParamType::ObjectList => "object[]",
            ParamType::Other(name) => name,
        }
    }

    /// Types a user may pick for the outputs of a freely editable node.
    pub fn is_user_selectable(&self) -> bool {
        matches!(
            self,
            ParamType::String | ParamType::Number | ParamType::Boolean
        )
    }
}

impl From<String> for ParamType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "string" => ParamType::String,
            "number" => ParamType::Number,
            "boolean" => ParamType::Boolean,
            "object" => ParamType::Object,
            "string[]" => ParamType::StringList,
            "object[]" => ParamType::ObjectList,
            _ => ParamType::Other(value),
        }
    }
}

impl From<&str> for ParamType {
    fn from(value: &str) -> Self {
        ParamType::from(value.to_string())
    }
}

impl From<ParamType> for String {
    fn from(value: ParamType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed value a node declares it can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputParam {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl OutputParam {
    pub fn new(name: &str, param_type: ParamType, desc: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            desc: (!desc.is_empty()).then(|| desc.to_string()),
        }
    }
}

/// A named input slot, optionally bound to an upstream output.
///
/// The binding is kept as the raw reference string because a half-filled
/// form row (name typed, source not yet picked) is a legitimate saved state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputParam {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_source: Option<String>,
}

impl InputParam {
    pub fn bound(name: &str, source: &ValueSource) -> Self {
        Self {
            name: name.to_string(),
            value_source: Some(source.to_string()),
        }
    }

    /// Parses the binding, if any. `Some(None)` means the reference is malformed.
    pub fn source(&self) -> Option<Option<ValueSource>> {
        self.value_source
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(ValueSource::parse)
    }
}

/// A reference to an upstream node's output: `"<nodeId>.output.<paramName>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueSource {
    pub node_id: String,
    pub param: String,
}

impl ValueSource {
    const SEPARATOR: &'static str = ".output.";

    pub fn new(node_id: &str, param: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            param: param.to_string(),
        }
    }

    /// Splits on the first `.output.`; both halves must be non-empty.
    pub fn parse(reference: &str) -> Option<Self> {
        let (node_id, param) = reference.split_once(Self::SEPARATOR)?;
        if node_id.is_empty() || param.is_empty() {
            return None;
        }
        Some(Self::new(node_id, param))
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.node_id, Self::SEPARATOR, self.param)
    }
}
