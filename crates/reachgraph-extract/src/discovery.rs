//! FileDiscovery (§4.1): expand include/exclude globs into a deduplicated,
//! ordered, project-relative file list.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use reachgraph_core::ResolvedConfig;

fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Walks `config.project_root`, keeping files that match `include` and do
/// not match `exclude`, deduplicating (symlinks resolved to their
/// canonical path first) while preserving first-seen order. Returns
/// project-relative, forward-slash paths.
///
/// No fatal error path (§4.1: "none fatal; an empty result yields an
/// empty artifact").
pub fn discover_files(config: &ResolvedConfig) -> anyhow::Result<Vec<String>> {
    let root = Path::new(&config.project_root);
    let include = build_globset(&config.include)?;
    let exclude = build_globset(&config.exclude)?;

    let mut seen = std::collections::HashSet::new();
    let mut results = Vec::new();

    let walker = ignore::WalkBuilder::new(root).hidden(false).build();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let path = entry.path();
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let relative = match canonical.strip_prefix(root.canonicalize().unwrap_or_else(|_| root.to_path_buf())) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => continue,
        };

        let relative_str = to_forward_slash(&relative);

        if !include.is_match(&relative_str) || exclude.is_match(&relative_str) {
            continue;
        }

        if seen.insert(relative_str.clone()) {
            results.push(relative_str);
        }
    }

    Ok(results)
}

fn to_forward_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
