use super::InstructionDocument;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const IMPORT_DIRECTIVE: &str = "@import";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPath {
    declared: String,
    resolved: PathBuf,
}

impl ImportPath {
    pub fn declared(&self) -> &str {
        &self.declared
    }

    pub fn path(&self) -> &Path {
        &self.resolved
    }
}

#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    #[serde(default)]
    imports: Vec<String>,
}

pub fn resolve_imports(document: &InstructionDocument) -> Vec<ImportPath> {
    let (front_matter, body) = split_front_matter(document.text());
    let mut declared = front_matter.map(front_matter_imports).unwrap_or_default();
    declared.extend(directive_imports(body));

    let base = document.base_dir();
    let mut seen = HashSet::new();
    declared
        .into_iter()
        .filter_map(|raw| {
            let resolved = if Path::new(&raw).is_absolute() {
                PathBuf::from(&raw)
            } else {
                base.join(&raw)
            };
            seen.insert(resolved.clone()).then_some(ImportPath {
                declared: raw,
                resolved,
            })
        })
        .collect()
}

fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let text = text.trim_start_matches('\u{feff}');
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, text)
}

fn front_matter_imports(raw: &str) -> Vec<String> {
    serde_yaml::from_str::<Option<FrontMatter>>(raw)
        .ok()
        .flatten()
        .unwrap_or_default()
        .imports
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn directive_imports(body: &str) -> Vec<String> {
    let mut in_fence = false;
    let mut imports = Vec::new();
    for line in body.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let Some(rest) = trimmed.strip_prefix(IMPORT_DIRECTIVE) else {
            continue;
        };
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }
        let target = unquote(rest.trim());
        if !target.is_empty() {
            imports.push(target.to_string());
        }
    }
    imports
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    value
}
