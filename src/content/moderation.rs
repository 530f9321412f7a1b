//! Text moderation before persistence.
//!
//! # Design Decisions
//! - Moderation rewrites text, it never blocks a write
//! - When the moderator is unreachable the original text is kept

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::remote::{RemoteStore, StoreError, StoreResult};

/// Rewrites user-submitted text.
#[async_trait]
pub trait Moderator: Send + Sync {
    async fn moderate(&self, text: &str) -> StoreResult<String>;
}

/// Moderation through a backend edge function.
pub struct RemoteModerator {
    store: Arc<dyn RemoteStore>,
    function: String,
}

impl RemoteModerator {
    pub fn new(store: Arc<dyn RemoteStore>, function: impl Into<String>) -> Self {
        Self {
            store,
            function: function.into(),
        }
    }
}

#[async_trait]
impl Moderator for RemoteModerator {
    async fn moderate(&self, text: &str) -> StoreResult<String> {
        let response = self
            .store
            .invoke(&self.function, json!({ "content": text }))
            .await?;
        response
            .get("moderatedContent")
            .or_else(|| response.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                StoreError::Decode(format!("{} returned no moderated content", self.function))
            })
    }
}

/// Local moderator masking a fixed word list.
#[derive(Debug, Clone, Default)]
pub struct WordFilter {
    words: Vec<String>,
}

impl WordFilter {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Replace every whole-word match (case-insensitive) with asterisks.
    pub fn mask(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut word = String::new();
        for c in text.chars() {
            if c.is_alphanumeric() {
                word.push(c);
            } else {
                self.flush(&mut word, &mut out);
                out.push(c);
            }
        }
        self.flush(&mut word, &mut out);
        out
    }

    fn flush(&self, word: &mut String, out: &mut String) {
        if word.is_empty() {
            return;
        }
        if self.words.contains(&word.to_lowercase()) {
            out.extend(std::iter::repeat('*').take(word.chars().count()));
        } else {
            out.push_str(word);
        }
        word.clear();
    }
}

#[async_trait]
impl Moderator for WordFilter {
    async fn moderate(&self, text: &str) -> StoreResult<String> {
        Ok(self.mask(text))
    }
}

/// Moderate the string values of `fields` in `row` in place.
///
/// Returns true if any value changed.
pub async fn moderate_fields(moderator: &dyn Moderator, row: &mut Value, fields: &[&str]) -> bool {
    let Value::Object(map) = row else {
        return false;
    };
    let mut changed = false;
    for field in fields {
        let Some(Value::String(original)) = map.get(*field).cloned() else {
            continue;
        };
        match moderator.moderate(&original).await {
            Ok(moderated) if moderated != original => {
                tracing::debug!(field, "Text auto-moderated");
                map.insert(field.to_string(), Value::String(moderated));
                changed = true;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(field, error = %e, "Moderation unavailable, keeping original text");
            }
        }
    }
    changed
}
