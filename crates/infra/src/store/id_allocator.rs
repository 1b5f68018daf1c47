//! Sequential identifiers for the file backend.

use storefront_core::Entity;

/// Allocates numeric string ids: one past the last record.
///
/// Records written by hand may carry non-numeric ids. When the last one is not
/// numeric, allocation falls back to one past the largest numeric id, and to
/// `"1"` when there is none. A candidate that is already taken (records
/// reordered by hand) is bumped the same way. Callers must hold the collection lock so that two
/// writers never observe the same "last" record.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdAllocator;

impl IdAllocator {
    pub fn next_id<E: Entity>(records: &[E]) -> String {
        let numeric = |record: &E| record.id().as_ref().trim().parse::<u64>().ok();

        let past_max = || {
            records
                .iter()
                .filter_map(numeric)
                .max()
                .map_or(1, |max| max.saturating_add(1))
        };

        let next = match records.last().and_then(numeric) {
            Some(last) => {
                let candidate = last.saturating_add(1);
                if records.iter().any(|r| numeric(r) == Some(candidate)) {
                    past_max()
                } else {
                    candidate
                }
            }
            None => past_max(),
        };
        next.to_string()
    }
}
