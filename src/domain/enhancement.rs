// Prompt enhancement domain model
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnhancementError {
    #[error("unknown enhancement kind: {0}")]
    UnknownKind(String),
    #[error("'{value}' is not an option for {kind}")]
    UnknownOption { kind: EnhancementKind, value: String },
}

/// Annotation categories offered next to the chat input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancementKind {
    Emotion,
    Technology,
    Style,
    Complexity,
    Audience,
}

impl EnhancementKind {
    pub const ALL: [EnhancementKind; 5] = [
        EnhancementKind::Emotion,
        EnhancementKind::Technology,
        EnhancementKind::Style,
        EnhancementKind::Complexity,
        EnhancementKind::Audience,
    ];

    /// Label shown to the user and used in the prompt prefix.
    pub fn label(self) -> &'static str {
        match self {
            EnhancementKind::Emotion => "Tone",
            EnhancementKind::Technology => "Tech Stack",
            EnhancementKind::Style => "Style",
            EnhancementKind::Complexity => "Complexity",
            EnhancementKind::Audience => "Audience",
        }
    }

    pub fn options(self) -> &'static [&'static str] {
        match self {
            EnhancementKind::Emotion => &["Professional", "Friendly", "Persuasive", "Empathetic"],
            EnhancementKind::Technology => &["React/TS", "Python", "Node.js", "Rust"],
            EnhancementKind::Style => &["Concise", "Technical", "Detailed", "Simple"],
            EnhancementKind::Complexity => &["Basic", "Intermediate", "Advanced"],
            EnhancementKind::Audience => &["Developers", "Executives", "Students", "General"],
        }
    }

    pub fn is_pro(self) -> bool {
        matches!(self, EnhancementKind::Technology)
    }

    fn as_str(self) -> &'static str {
        match self {
            EnhancementKind::Emotion => "emotion",
            EnhancementKind::Technology => "technology",
            EnhancementKind::Style => "style",
            EnhancementKind::Complexity => "complexity",
            EnhancementKind::Audience => "audience",
        }
    }
}

impl fmt::Display for EnhancementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnhancementKind {
    type Err = EnhancementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| EnhancementError::UnknownKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnhancementSelection {
    pub kind: EnhancementKind,
    pub label: &'static str,
    pub value: String,
}

/// Active selections, at most one per kind.
#[derive(Debug, Clone, Default)]
pub struct Enhancements {
    selected: BTreeMap<EnhancementKind, String>,
}

impl Enhancements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection for `kind`. The value must be one of the kind's options.
    pub fn select(&mut self, kind: EnhancementKind, value: &str) -> Result<(), EnhancementError> {
        let option = kind
            .options()
            .iter()
            .find(|option| **option == value)
            .ok_or_else(|| EnhancementError::UnknownOption {
                kind,
                value: value.to_string(),
            })?;
        self.selected.insert(kind, (*option).to_string());
        Ok(())
    }

    pub fn clear(&mut self, kind: EnhancementKind) -> bool {
        self.selected.remove(&kind).is_some()
    }

    pub fn clear_all(&mut self) {
        self.selected.clear();
    }

    pub fn selections(&self) -> Vec<EnhancementSelection> {
        self.selected
            .iter()
            .map(|(kind, value)| EnhancementSelection {
                kind: *kind,
                label: kind.label(),
                value: value.clone(),
            })
            .collect()
    }

    /// Prefix `text` with one `[label: value]` tag per selection, in kind order.
    pub fn apply(&self, text: &str) -> String {
        let mut enhanced = String::new();
        for (kind, value) in &self.selected {
            enhanced.push_str(&format!("[{}: {}] ", kind.label(), value));
        }
        enhanced.push_str(text);
        enhanced
    }
}
