//! Resolved configuration consumed by the core pipeline (§6.2).
//!
//! The CLI driver is responsible for producing this from flags and/or a
//! config file; the core only consumes it. Kept concrete (not opaque)
//! because downstream components read individual fields directly.

use serde::{Deserialize, Serialize};

use crate::model::Language;

/// One rule in an `entryPoints` list (§4.4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "lowercase")]
pub enum EntryPointRule {
    File { pattern: String },
    Function { name: String },
    Decorator { name: String },
    Export { pattern: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypescriptConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsconfig: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub build_tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PythonConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venv_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_roots: Vec<String>,
}

/// The fully-resolved configuration the CLI hands to the pipeline (§6.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub language: Language,
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub entry_points: Vec<EntryPointRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub project_root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typescript: Option<TypescriptConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go: Option<GoConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<PythonConfig>,
}

impl ResolvedConfig {
    /// A minimal, valid configuration for a given language and root, with
    /// `include = ["**/*"]` and no exclusions — the default an empty CLI
    /// invocation resolves to.
    pub fn new(language: Language, project_root: impl Into<String>) -> Self {
        ResolvedConfig {
            language,
            include: vec!["**/*".to_string()],
            exclude: Vec::new(),
            entry_points: Vec::new(),
            output: None,
            project_root: project_root.into(),
            typescript: None,
            go: None,
            python: None,
        }
    }
}
