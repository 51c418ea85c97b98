//! Typed content blocks making up a dashboard artifact.

use serde::{Deserialize, Serialize};

/// One block of generated dashboard content.
///
/// The tag vocabulary is fixed; blocks with unknown tags are dropped
/// silently during normalization rather than failing validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Short headline summarizing the day.
    Headline { text: String },
    /// A single-event line (one fixture, one result).
    Event {
        text: String,
        /// Editorial importance, 0-100.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        importance: Option<u8>,
    },
    /// A grouped list of related events.
    EventGroup { title: String, items: Vec<String> },
    /// Free-text editorial note.
    Note { text: String },
    /// Card-style section with a title and body.
    Card { title: String, body: String },
    /// Section divider.
    Divider,
}

impl ContentBlock {
    /// Stable tag name, matching the wire format.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentBlock::Headline { .. } => "headline",
            ContentBlock::Event { .. } => "event",
            ContentBlock::EventGroup { .. } => "event_group",
            ContentBlock::Note { .. } => "note",
            ContentBlock::Card { .. } => "card",
            ContentBlock::Divider => "divider",
        }
    }

    /// Returns true for blocks representing at least one concrete event.
    pub fn is_event_block(&self) -> bool {
        matches!(
            self,
            ContentBlock::Event { .. } | ContentBlock::EventGroup { .. }
        )
    }

    /// Word-count budget for the block's main text, if it has one.
    ///
    /// Returns `(budget, text)` pairs checked by the validator: headlines
    /// stay short, notes and card bodies get more room.
    pub fn word_budget(&self) -> Option<(usize, &str)> {
        match self {
            ContentBlock::Headline { text } => Some((15, text)),
            ContentBlock::Event { text, .. } => Some((30, text)),
            ContentBlock::Note { text } => Some((40, text)),
            ContentBlock::Card { body, .. } => Some((60, body)),
            ContentBlock::EventGroup { .. } | ContentBlock::Divider => None,
        }
    }
}

/// Counts whitespace-separated words.
pub(crate) fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
