//! Conversation slots, turns, and the legacy id backfill.

use serde::{Deserialize, Serialize};

/// One of the two independent pane identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Primary,
    Secondary,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Primary, Slot::Secondary];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }

    /// Default pane label shown before the user names the endpoint.
    pub fn default_label(self) -> &'static str {
        match self {
            Self::Primary => "Primary endpoint",
            Self::Secondary => "Secondary endpoint",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Slot {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            other => anyhow::bail!("unknown slot '{other}' (expected: primary, secondary)"),
        }
    }
}

/// A pair of values, one per pane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panes<T> {
    pub primary: T,
    pub secondary: T,
}

impl<T> Panes<T> {
    pub fn new(primary: T, secondary: T) -> Self {
        Self { primary, secondary }
    }

    pub fn get(&self, slot: Slot) -> &T {
        match slot {
            Slot::Primary => &self.primary,
            Slot::Secondary => &self.secondary,
        }
    }

    pub fn get_mut(&mut self, slot: Slot) -> &mut T {
        match slot {
            Slot::Primary => &mut self.primary,
            Slot::Secondary => &mut self.secondary,
        }
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One entry in a pane's ordered sequence. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    /// Human-readable local time, captured when the turn was created.
    pub timestamp: String,
    /// Unique id; required for assistant turns that carry a trace. Absent
    /// only on legacy user turns from before ids existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_id: Option<String>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: now_stamp(),
            turn_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>, turn_id: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: now_stamp(),
            turn_id: Some(turn_id.into()),
        }
    }
}

/// The two per-slot turn sequences, as persisted in the history blob.
pub type History = Panes<Vec<ConversationTurn>>;

/// Mint a fresh id for an assistant turn. The slot prefix is load-bearing:
/// per-slot trace cleanup matches on it.
pub fn new_turn_id(slot: Slot) -> String {
    format!("{slot}-{}", uuid::Uuid::new_v4())
}

/// Assign `<slot>-legacy-<index>` ids to assistant turns saved before ids
/// existed. Returns how many turns were touched so the caller knows whether
/// to rewrite the blob.
pub fn backfill_turn_ids(history: &mut History) -> usize {
    let mut filled = 0;
    for slot in Slot::ALL {
        for (index, turn) in history.get_mut(slot).iter_mut().enumerate() {
            if turn.turn_id.is_none() && turn.role == Role::Assistant {
                turn.turn_id = Some(format!("{slot}-legacy-{index}"));
                filled += 1;
            }
        }
    }
    filled
}

fn now_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
