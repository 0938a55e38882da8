use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::affinity::PIRATE_COUNT;
use crate::coefficients::CoefficientTables;

const INDENT: &str = "    ";

/// Renders the six coefficient tables as source literals for one target language.
/// Implementors only describe a single table; ordering and joining are shared.
pub trait CoefficientRenderer: Send + Sync {
    fn language(&self) -> &'static str;

    fn file_name(&self) -> &'static str;

    fn render_table(&self, name: &str, values: &[f64; PIRATE_COUNT]) -> String;

    fn render(&self, tables: &CoefficientTables) -> String {
        tables
            .named_tables()
            .iter()
            .map(|(name, values)| self.render_table(name, values))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Shortest representation that parses back to the same f64; never rounds.
pub fn float_literal(value: f64) -> String {
    format!("{value:?}")
}

fn body_lines(values: impl Iterator<Item = String>) -> String {
    values
        .map(|v| format!("{INDENT}{v},\n"))
        .collect::<String>()
}

/// `export const NAME = { id: value, ... };` keyed by pirate id.
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaScriptRenderer;

impl CoefficientRenderer for JavaScriptRenderer {
    fn language(&self) -> &'static str {
        "javascript"
    }

    fn file_name(&self) -> &'static str {
        "javascript.js"
    }

    fn render_table(&self, name: &str, values: &[f64; PIRATE_COUNT]) -> String {
        let body = body_lines(
            values
                .iter()
                .enumerate()
                .map(|(idx, v)| format!("{}: {}", idx + 1, float_literal(*v))),
        );
        format!("export const {name} = {{\n{body}}};")
    }
}

/// `NAME = [ ... ]`, index 0 is pirate 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonRenderer;

impl CoefficientRenderer for PythonRenderer {
    fn language(&self) -> &'static str {
        "python"
    }

    fn file_name(&self) -> &'static str {
        "python.py"
    }

    fn render_table(&self, name: &str, values: &[f64; PIRATE_COUNT]) -> String {
        let body = body_lines(values.iter().map(|v| float_literal(*v)));
        format!("{name} = [\n{body}]")
    }
}

/// `static NAME: [f64; 20] = [ ... ];`, index 0 is pirate 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustRenderer;

impl CoefficientRenderer for RustRenderer {
    fn language(&self) -> &'static str {
        "rust"
    }

    fn file_name(&self) -> &'static str {
        "rust.rs"
    }

    fn render_table(&self, name: &str, values: &[f64; PIRATE_COUNT]) -> String {
        let body = body_lines(values.iter().map(|v| float_literal(*v)));
        format!("static {name}: [f64; {PIRATE_COUNT}] = [\n{body}];")
    }
}

pub fn default_renderers() -> Vec<Box<dyn CoefficientRenderer>> {
    vec![
        Box::new(JavaScriptRenderer),
        Box::new(RustRenderer),
        Box::new(PythonRenderer),
    ]
}

/// Writes one file per renderer into `out_dir`, returning the paths written.
pub fn write_rendered(
    out_dir: &Path,
    tables: &CoefficientTables,
    renderers: &[Box<dyn CoefficientRenderer>],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir.display()))?;
    let mut written = Vec::with_capacity(renderers.len());
    for renderer in renderers {
        let path = out_dir.join(renderer.file_name());
        info!(language = renderer.language(), path = %path.display(), "writing coefficients");
        fs::write(&path, renderer.render(tables))
            .with_context(|| format!("write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
