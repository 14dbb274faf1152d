//! Tool descriptors — the shape a capability provider advertises via
//! `list_tools`, and the shape the tool-call runtime uses to build a
//! typed binding (§4.7, §9).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The declared JSON kind of a tool parameter. Used at bind time to
/// generate a typed thunk that coerces string inputs to the declared
/// kind — tolerating LLM argument drift (e.g. `"5"` where `5` was
/// expected) without reflection at call time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    /// JSON string.
    String,
    /// JSON integer.
    Integer,
    /// JSON number (integer or float).
    Number,
    /// JSON boolean.
    Boolean,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
}

/// One parameter in a tool's input schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParam {
    /// The declared kind.
    #[serde(rename = "type")]
    pub kind: ParamKind,
    /// Human-readable description, shown to the LLM.
    pub description: Option<String>,
    /// Default value, if the parameter is optional.
    pub default: Option<serde_json::Value>,
}

/// A tool's input schema: a JSON-Schema-like object of named parameters
/// plus which of them are required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputSchema {
    /// Parameter name → declaration.
    #[serde(default)]
    pub properties: HashMap<String, ToolParam>,
    /// Names of required parameters.
    #[serde(default)]
    pub required: Vec<String>,
}

/// A tool as advertised by a provider's `list_tools` RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, unique within a provider (and, after binding, globally
    /// in the runtime's cached tool map).
    pub name: String,
    /// Textual description, shown to the LLM.
    pub description: String,
    /// Input schema.
    pub input_schema: InputSchema,
}
