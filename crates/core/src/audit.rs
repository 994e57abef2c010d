//! Append-only construction of request history and comment entries.
//!
//! Entries carry a wall-clock timestamp assigned here, at append time, so a
//! request's history order cannot be forged by client clocks. Appends are
//! copy-on-append: the input sequence is never mutated, reordered, or
//! truncated.

use chrono::Utc;

use crate::domain::request::{ActorRole, CommentEntry, HistoryEntry, RequestStatus};

/// Action text of the history entry written when a request is created.
pub const ACTION_SUBMITTED: &str = "request submitted";

/// Returns a new sequence with `entry` appended; existing entries keep
/// their positions.
pub fn append<T: Clone>(log: &[T], entry: T) -> Vec<T> {
    let mut next = Vec::with_capacity(log.len() + 1);
    next.extend_from_slice(log);
    next.push(entry);
    next
}

/// History entry recorded atomically with request creation.
pub fn submission_entry(author: impl Into<String>) -> HistoryEntry {
    HistoryEntry {
        action: ACTION_SUBMITTED.to_owned(),
        author: author.into(),
        timestamp: Utc::now(),
    }
}

/// History entry recorded for an accepted status transition.
pub fn status_entry(target: RequestStatus, author: impl Into<String>) -> HistoryEntry {
    HistoryEntry {
        action: format!("status changed to {target}"),
        author: author.into(),
        timestamp: Utc::now(),
    }
}

pub fn comment_entry(
    author: impl Into<String>,
    role: ActorRole,
    comment: impl Into<String>,
) -> CommentEntry {
    CommentEntry {
        author: author.into(),
        role,
        comment: comment.into(),
        timestamp: Utc::now(),
    }
}
