//! Reconciling a fetched history with messages already held locally.

use std::collections::HashSet;

use parley_proto::Message;

/// Merges a fetched history with local messages.
///
/// `local` is every message the log held for the chat, both before the
/// request went out and those that arrived while it was in flight. The
/// result contains each id once, with fetched content taking precedence,
/// ordered by ascending timestamp. Equal timestamps keep fetched messages
/// first, then local ones in their existing order.
#[must_use]
pub fn merge_fetched<'a>(
    fetched: Vec<Message>,
    local: impl IntoIterator<Item = &'a Message>,
) -> Vec<Message> {
    let mut seen = HashSet::with_capacity(fetched.len());
    let mut merged: Vec<Message> = fetched
        .into_iter()
        .filter(|m| seen.insert(m.id.clone()))
        .collect();

    merged.extend(
        local
            .into_iter()
            .filter(|m| seen.insert(m.id.clone()))
            .cloned(),
    );
    merged.sort_by_key(|m| m.timestamp);
    merged
}
