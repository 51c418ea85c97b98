//! Deterministic fallback artifact.
//!
//! When generation exhausts its retry budget the dashboard still ships:
//! this builder assembles a plain artifact straight from the fetched data.
//! Its structure is hand-guaranteed to satisfy the quality gate: at least
//! three blocks, at least one event block, every text within budget.

use crate::quality::ContentBlock;

use super::generator::DashboardContext;

/// How many events get their own line before the rest are grouped.
const MAX_INDIVIDUAL_EVENTS: usize = 3;

/// Builds a non-AI artifact from the dashboard context.
pub fn build_fallback(context: &DashboardContext) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();

    let title = if context.title.trim().is_empty() {
        "Today's results".to_string()
    } else {
        clamp_words(&context.title, 15)
    };
    blocks.push(ContentBlock::Headline { text: title });

    if context.events.is_empty() {
        // The gate demands a concrete event block even on a quiet day.
        blocks.push(ContentBlock::EventGroup {
            title: "Fixtures".to_string(),
            items: vec!["No completed fixtures yet".to_string()],
        });
    } else {
        for event in context.events.iter().take(MAX_INDIVIDUAL_EVENTS) {
            blocks.push(ContentBlock::Event {
                text: clamp_words(&event.text, 30),
                importance: Some(event.importance),
            });
        }
        let rest: Vec<String> = context
            .events
            .iter()
            .skip(MAX_INDIVIDUAL_EVENTS)
            .map(|e| clamp_words(&e.text, 30))
            .collect();
        if !rest.is_empty() {
            blocks.push(ContentBlock::EventGroup {
                title: "More results".to_string(),
                items: rest,
            });
        }
    }

    blocks.push(ContentBlock::Divider);

    if let Some(note) = context.notes.first() {
        blocks.push(ContentBlock::Note {
            text: clamp_words(note, 40),
        });
    }

    blocks
}

/// Truncates text to a word budget.
fn clamp_words(text: &str, budget: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= budget {
        words.join(" ")
    } else {
        words[..budget].join(" ")
    }
}
