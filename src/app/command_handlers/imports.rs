use crate::instruction::{resolve_imports, InstructionDocument};
use std::path::Path;

pub fn cmd_imports(args: &[String]) -> Result<String, String> {
    let [path] = args else {
        return Err("usage: imports <instruction.md>".to_string());
    };
    let document = InstructionDocument::load(Path::new(path)).map_err(|e| e.to_string())?;
    let imports = resolve_imports(&document);
    if imports.is_empty() {
        return Ok("no imports".to_string());
    }
    Ok(imports
        .iter()
        .map(|import| import.path().display().to_string())
        .collect::<Vec<_>>()
        .join("\n"))
}
