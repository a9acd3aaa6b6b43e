use super::model::{TokenCollection, TokenSet};

// ---------------------------------------------------------------------------
// Count-summing merge
// ---------------------------------------------------------------------------

/// Merge `b` into `a`: records with the same token have their good and bad
/// counts summed, records present on one side only are copied unchanged.
///
/// This reconciles the good-only and bad-only halves of a binary training
/// file, and also works for two complete token sets that carry both counts.
pub fn merge_token_sets(a: TokenSet, b: TokenSet) -> TokenSet {
    let mut merged = a;
    for (token, record) in b {
        merged
            .entry(token)
            .and_modify(|existing| existing.accumulate(&record))
            .or_insert(record);
    }
    merged
}

/// Combine two whole collections: message counters are summed pairwise and
/// token counts merged per key.
pub fn merge_collections(a: &TokenCollection, b: &TokenCollection) -> TokenCollection {
    let mut merged = a.clone();
    merged.absorb(b.clone());
    merged
}

impl TokenCollection {
    /// Import `other` into this collection (message counters and tokens).
    pub fn absorb(&mut self, other: TokenCollection) {
        self.set_good_message_count(
            self.good_message_count()
                .saturating_add(other.good_message_count()),
        );
        self.set_bad_message_count(
            self.bad_message_count()
                .saturating_add(other.bad_message_count()),
        );
        let mine = self.take_token_set();
        self.replace_token_set(merge_token_sets(mine, other.into_token_set()));
    }
}
