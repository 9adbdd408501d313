//! Transcript documents for a pane's conversation.

use chrono::{DateTime, Utc};

use crate::history::ConversationTurn;
use crate::util::sanitize_filename_component;

/// Render the markdown transcript for one pane.
///
/// One numbered section per turn, each carrying the turn's timestamp and its
/// role-labeled content verbatim. Rejecting an empty transcript is the
/// caller's job; this renderer is pure.
pub fn transcript_document(label: &str, turns: &[ConversationTurn]) -> String {
    let mut doc = format!("# {label} conversation transcript\n");
    doc.push_str(&format!(
        "Exported: {}\n\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));

    for (index, turn) in turns.iter().enumerate() {
        doc.push_str(&format!("## Turn {}\n", index + 1));
        doc.push_str(&format!("**Time**: {}\n", turn.timestamp));
        doc.push_str(&format!("**{}**: {}\n\n", turn.role.label(), turn.content));
    }

    doc
}

/// Filename for an export: label plus an ISO-like UTC stamp with colons
/// replaced by hyphens, e.g. `Staging_transcript_2024-05-01T09-30-00.md`.
pub fn export_filename(label: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}_transcript_{}.md",
        sanitize_filename_component(label),
        now.format("%Y-%m-%dT%H-%M-%S")
    )
}
