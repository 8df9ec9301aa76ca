// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Size caps for text that leaves an activity.
//!
//! Activity outputs, error excerpts and notification fragments are bounded so
//! that a runaway subprocess or agent transcript cannot blow up the journal,
//! the log file or a chat message.

/// Maximum characters kept from a successful activity output
pub const MAX_OUTPUT_CHARS: usize = 50_000;

/// Maximum characters kept from a subprocess's stderr or a raw error body
pub const MAX_ERROR_CHARS: usize = 2_000;

/// Characters kept from a step message in a run report
pub const MAX_STEP_MESSAGE_CHARS: usize = 500;

/// Characters of an output quoted in a notification or persisted step entry
pub const MAX_EXCERPT_CHARS: usize = 200;

/// Characters of a step message shown on a report summary line
pub const MAX_SUMMARY_LINE_CHARS: usize = 80;

/// Truncate to at most `max` characters, never splitting a UTF-8 sequence
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Shorthand for an excerpt suitable for notifications
pub fn excerpt(text: &str) -> String {
    truncate_chars(text, MAX_EXCERPT_CHARS)
}
