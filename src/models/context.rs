//! The context document handed to the chatbot grounding layer.

use serde::Serialize;
use serde_json::{Map, Value};

/// Data category a section belongs to; also fixes its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Tree,
    Species,
    Ecology,
    Location,
    Health,
    History,
}

impl SectionKind {
    /// Fixed prefix downstream consumers match on.
    pub fn header(&self) -> &'static str {
        match self {
            SectionKind::Tree => "DATI ALBERO:",
            SectionKind::Species => "DATI BOTANICI:",
            SectionKind::Ecology => "DATI ECOLOGICI:",
            SectionKind::Location => "DATI LUOGO:",
            SectionKind::Health => "DATI SALUTE:",
            SectionKind::History => "DATI STORICI:",
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            SectionKind::Tree => "tree",
            SectionKind::Species => "species",
            SectionKind::Ecology => "ecology",
            SectionKind::Location => "location",
            SectionKind::Health => "health",
            SectionKind::History => "history",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSection {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SectionKind,
    /// Header line followed by the section body.
    pub content: String,
    pub tags: Vec<String>,
    pub metadata: Map<String, Value>,
}

impl ContextSection {
    /// Creates a section whose content starts with the kind's header line.
    pub fn new(kind: SectionKind, body: &str) -> Self {
        Self {
            id: kind.id().to_string(),
            kind,
            content: format!("{}\n{}", kind.header(), body.trim_end()),
            tags: Vec::new(),
            metadata: Map::new(),
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Ordered list of sections for one tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextDocument {
    pub tree_id: String,
    pub sections: Vec<ContextSection>,
}

impl ContextDocument {
    pub fn section(&self, kind: SectionKind) -> Option<&ContextSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Flattened form fed verbatim to the chatbot: sections separated by a blank line.
    pub fn to_text(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
