//! ArtifactCodec (§4.9, §6.1): stable, versioned (de)serialization of the
//! `CodeGraph` artifact.
//!
//! Version gating is a string-prefix compare against the major component
//! of `SCHEMA_VERSION` — additive `1.x` fields are fine, a `2.x` artifact
//! is rejected. No `semver` dependency: the gate is "same major only" and
//! a split on the first `.` is sufficient.

use crate::error::{ReachError, Result};
use crate::model::{CodeGraph, SCHEMA_VERSION};

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Serializes a `CodeGraph` to pretty-printed JSON (§6.1 wire shape).
pub fn encode(graph: &CodeGraph) -> Result<String> {
    Ok(serde_json::to_string_pretty(graph)?)
}

/// Deserializes a `CodeGraph` from JSON, rejecting any document whose
/// schema major version does not match this codec's (`SchemaVersionUnsupported`,
/// §7). Unknown fields are ignored by construction — every artifact struct
/// in `model.rs` only projects the fields it declares.
pub fn decode(json: &str) -> Result<CodeGraph> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let found_version = value
        .get("metadata")
        .and_then(|m| m.get("version"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| ReachError::ConfigInvalid("artifact missing metadata.version".to_string()))?;

    if major(found_version) != major(SCHEMA_VERSION) {
        return Err(ReachError::SchemaVersionUnsupported {
            found: found_version.to_string(),
            expected: SCHEMA_VERSION.to_string(),
        });
    }

    Ok(serde_json::from_value(value)?)
}
