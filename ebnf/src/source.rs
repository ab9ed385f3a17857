use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

use crate::Grammar;

/// Where a grammar's text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarSource {
    Inline(String),
    /// A grammar file. Relative paths are resolved against
    /// `CARGO_MANIFEST_DIR`, or the working directory when it isn't set.
    File(PathBuf),
}

impl GrammarSource {
    pub fn load(&self) -> Result<Grammar> {
        match self {
            GrammarSource::Inline(text) => Ok(text.parse()?),
            GrammarSource::File(path) => {
                let path = resolve(path);
                debug!("loading grammar from {}", path.display());
                let data = fs::read_to_string(&path)
                    .with_context(|| format!("read ebnf file: {}", path.display()))?;
                let grammar: Grammar = data
                    .parse()
                    .with_context(|| format!("parse ebnf file: {}", path.display()))?;
                Ok(grammar)
            }
        }
    }
}

fn resolve(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let root = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into());
    Path::new(&root).join(path)
}
