//! `{{name}}` placeholder population.
//!
//! Population is strict in both directions: a placeholder with no value and
//! a value with no placeholder are both errors, so a renamed section or a
//! typo in a template fails at the first render instead of silently
//! shipping a prompt with a hole in it.

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Template population failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template placeholder {{{{{0}}}}} has no value")]
    Unfilled(String),
    #[error("value '{0}' does not match any template placeholder")]
    Unused(String),
    #[error("unterminated placeholder at byte {0}")]
    Unterminated(usize),
    #[error("invalid placeholder name '{0}'")]
    InvalidName(String),
}

/// A prompt template with `{{name}}` placeholders. Names are ASCII
/// alphanumerics and underscores.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Every distinct placeholder name in the template.
    pub fn placeholders(&self) -> Result<BTreeSet<String>, TemplateError> {
        let mut names = BTreeSet::new();
        for piece in self.pieces()? {
            if let Piece::Placeholder(name) = piece {
                names.insert(name.to_string());
            }
        }
        Ok(names)
    }

    /// Substitute every placeholder with its value.
    pub fn render(&self, values: &BTreeMap<&str, String>) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.text.len());
        let mut used = BTreeSet::new();
        for piece in self.pieces()? {
            match piece {
                Piece::Text(t) => out.push_str(t),
                Piece::Placeholder(name) => {
                    let value = values
                        .get(name)
                        .ok_or_else(|| TemplateError::Unfilled(name.to_string()))?;
                    out.push_str(value);
                    used.insert(name);
                }
            }
        }
        if let Some(unused) = values.keys().find(|k| !used.contains(*k)) {
            return Err(TemplateError::Unused(unused.to_string()));
        }
        Ok(out)
    }

    fn pieces(&self) -> Result<Vec<Piece<'_>>, TemplateError> {
        let mut pieces = Vec::new();
        let mut rest = self.text.as_str();
        let mut offset = 0;
        while let Some((before, after_open)) = rest.split_once(OPEN) {
            let Some((name, after)) = after_open.split_once(CLOSE) else {
                return Err(TemplateError::Unterminated(offset + before.len()));
            };
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(TemplateError::InvalidName(name.to_string()));
            }
            if !before.is_empty() {
                pieces.push(Piece::Text(before));
            }
            pieces.push(Piece::Placeholder(name));
            offset += before.len() + OPEN.len() + name.len() + CLOSE.len();
            rest = after;
        }
        if !rest.is_empty() {
            pieces.push(Piece::Text(rest));
        }
        Ok(pieces)
    }
}

enum Piece<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}
