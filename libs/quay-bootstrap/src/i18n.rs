//! Localized statement store.
//!
//! Statements live in one JSON document per language under the configured
//! i18n folder. Each statement is keyed by the SHA-256 of its template so
//! translators can add entries without touching code.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct I18nStatement {
    pub key: String,
    pub content: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct I18nDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub statements: Vec<I18nStatement>,
}

impl I18nDocument {
    fn new(language: &str) -> Self {
        Self {
            name: language.to_string(),
            description: String::new(),
            statements: Vec::new(),
        }
    }
}

/// Read-only localized string lookup for one language.
#[derive(Debug, Clone)]
pub struct I18n {
    language: String,
    file: PathBuf,
    statements: HashMap<String, String>,
}

impl I18n {
    /// Load the statement document for `language` from `folder`, creating
    /// the folder and an empty document when they do not exist yet.
    pub fn load(folder: &Path, language: &str) -> Result<Self> {
        std::fs::create_dir_all(folder)
            .with_context(|| format!("failed to create i18n folder {}", folder.display()))?;
        let file = folder.join(format!("{language}.json"));

        let doc = if file.is_file() {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            serde_json::from_str::<I18nDocument>(&raw)
                .with_context(|| format!("failed to parse {}", file.display()))?
        } else {
            let doc = I18nDocument::new(language);
            let raw = serde_json::to_string_pretty(&doc)?;
            std::fs::write(&file, raw)
                .with_context(|| format!("failed to write {}", file.display()))?;
            doc
        };

        let statements = doc
            .statements
            .into_iter()
            .map(|s| (s.key, s.content))
            .collect();

        Ok(Self {
            language: language.to_string(),
            file,
            statements,
        })
    }

    /// Statement key for a template: hex-encoded SHA-256.
    pub fn statement_key(template: &str) -> String {
        hex::encode(Sha256::digest(template.as_bytes()))
    }

    /// Localize `template` and substitute positional `{n}` arguments. Falls
    /// back to the template itself when no localized statement exists.
    pub fn content(&self, template: &str, args: &[&str]) -> String {
        let tpl = self
            .statements
            .get(&Self::statement_key(template))
            .map(String::as_str)
            .unwrap_or(template);

        let mut out = tpl.to_string();
        for (i, arg) in args.iter().enumerate() {
            out = out.replace(&format!("{{{i}}}"), arg);
        }
        out
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
