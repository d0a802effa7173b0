//! Incoming-message cursor protocol state.
//!
//! The cursor is the maximum message identifier observed so far. Ids are a
//! monotonic backend sequence transmitted as strings; they are compared as
//! big integers, never lexicographically or as floats, so large sequence
//! numbers keep their order. Merging a batch is idempotent and the log is
//! re-sorted by timestamp after every merge, because delivery order is not
//! guaranteed to match timestamp order.

use aone_core::message::{AssistantMessage, IncomingMessage};
use std::collections::HashSet;

/// Result of merging one polled batch into the log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Number of genuinely new entries appended; notifications fire only
    /// when this is nonzero.
    pub appended: usize,
    /// Whether the batch contained an in-progress entry (kept out of the
    /// log); lets the owning UI bound its typing indicator.
    pub saw_processing: bool,
}

impl MergeOutcome {
    pub fn appended_any(&self) -> bool {
        self.appended > 0
    }
}

/// In-memory state of the assistant console: the message log, the poll
/// cursor and the local-only view filters.
#[derive(Debug, Default)]
pub struct Inbox {
    cursor: Option<i128>,
    log: Vec<AssistantMessage>,
    cleared: bool,
    cleared_at: i64,
    date_range: Option<(i64, i64)>,
}

impl Inbox {
    /// Starts with an empty log and no cursor ("from the beginning").
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a previously persisted log. The cursor is intentionally
    /// left unset: re-fetching from the beginning is harmless because the
    /// merge deduplicates by id.
    pub fn with_log(log: Vec<AssistantMessage>) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    /// The current cursor value.
    pub fn cursor(&self) -> Option<i128> {
        self.cursor
    }

    /// The cursor as the decimal string sent in the poll request.
    pub fn cursor_param(&self) -> Option<String> {
        self.cursor.map(|cursor| cursor.to_string())
    }

    /// The full message log, oldest first.
    pub fn log(&self) -> &[AssistantMessage] {
        &self.log
    }

    /// Merges one polled batch: drops in-progress entries, advances the
    /// cursor (max over the batch, forward only), deduplicates by id,
    /// appends new entries and re-sorts the log by timestamp.
    pub fn apply_batch(&mut self, batch: Vec<IncomingMessage>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        let mut batch_max: Option<i128> = None;
        let mut known: HashSet<String> = self
            .log
            .iter()
            .map(|message| message.id.clone())
            .collect();
        let mut fresh: Vec<AssistantMessage> = Vec::new();

        for incoming in batch {
            if incoming.is_processing() {
                outcome.saw_processing = true;
                continue;
            }
            if let Some(id) = parse_sequence_id(&incoming.id) {
                batch_max = Some(batch_max.map_or(id, |current| current.max(id)));
            }
            if incoming.id.is_empty() || !known.insert(incoming.id.clone()) {
                continue;
            }
            fresh.push(incoming.into_assistant_message());
        }

        // The cursor only ever moves forward; a stale batch with a smaller
        // or equal maximum leaves it unchanged.
        if let Some(new_max) = batch_max
            && self.cursor.is_none_or(|current| new_max > current)
        {
            self.cursor = Some(new_max);
        }

        if !fresh.is_empty() {
            outcome.appended = fresh.len();
            self.log.extend(fresh);
            self.sort_log();
        }
        outcome
    }

    /// Appends a locally produced entry (user message, synthesized reply or
    /// error) and keeps the log ordered. Duplicate ids are ignored.
    pub fn append(&mut self, message: AssistantMessage) {
        if self.log.iter().any(|existing| existing.id == message.id) {
            return;
        }
        self.log.push(message);
        self.sort_log();
    }

    /// Hides everything at or before the watermark until `show_all`.
    pub fn clear_dialog(&mut self, watermark_millis: i64) {
        self.cleared = true;
        self.cleared_at = watermark_millis;
    }

    /// Restricts the visible window to `[from, to]` (epoch milliseconds).
    pub fn set_date_range(&mut self, from_millis: i64, to_millis: i64) {
        self.date_range = Some((from_millis, to_millis));
    }

    pub fn clear_date_range(&mut self) {
        self.date_range = None;
    }

    /// Resets the cleared watermark and the date range.
    pub fn show_all(&mut self) {
        self.cleared = false;
        self.cleared_at = 0;
        self.date_range = None;
    }

    /// The log filtered by the intersection of the cleared watermark and the
    /// explicit date range. Never mutates the log or the cursor.
    pub fn visible_messages(&self) -> Vec<&AssistantMessage> {
        self.log
            .iter()
            .filter(|message| {
                if self.cleared && message.timestamp <= self.cleared_at {
                    return false;
                }
                if let Some((from, to)) = self.date_range {
                    return message.timestamp >= from && message.timestamp <= to;
                }
                true
            })
            .collect()
    }

    fn sort_log(&mut self) {
        self.log.sort_by_key(|message| message.timestamp);
    }
}

/// Parses a wire id as a big integer; ids up to and beyond 2^63 must compare
/// correctly, so this goes through i128 rather than f64 or string order.
fn parse_sequence_id(id: &str) -> Option<i128> {
    id.trim().parse::<i128>().ok()
}
