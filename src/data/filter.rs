use serde::{Deserialize, Serialize};

use super::model::{TokenCollection, TokenRecord};

// ---------------------------------------------------------------------------
// Threshold predicate: which tokens are worth keeping
// ---------------------------------------------------------------------------

/// Minimum good / bad counts a token needs to survive [`remove_tokens`].
///
/// A threshold `<= 0` disables that side of the predicate. With both sides
/// disabled the filter keeps everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub good: i64,
    pub bad: i64,
}

impl Thresholds {
    pub fn new(good: i64, bad: i64) -> Self {
        Self { good, bad }
    }

    pub fn is_disabled(&self) -> bool {
        self.good <= 0 && self.bad <= 0
    }

    /// A token is kept when it reaches *either* enabled threshold.
    pub fn keeps(&self, record: &TokenRecord) -> bool {
        if self.is_disabled() {
            return true;
        }
        let good_ok = self.good > 0 && i64::from(record.good_count) >= self.good;
        let bad_ok = self.bad > 0 && i64::from(record.bad_count) >= self.bad;
        good_ok || bad_ok
    }
}

/// Remove every token that reaches neither enabled threshold. Returns the
/// number of removed tokens; derived counts are recomputed afterwards.
pub fn remove_tokens(
    collection: &mut TokenCollection,
    good_threshold: i64,
    bad_threshold: i64,
) -> usize {
    let thresholds = Thresholds::new(good_threshold, bad_threshold);
    if thresholds.is_disabled() {
        return 0;
    }
    let removed = collection.retain(|record| thresholds.keeps(record));
    log::debug!(
        "threshold filter (good >= {good_threshold}, bad >= {bad_threshold}) \
         removed {removed} tokens, {} left",
        collection.len()
    );
    removed
}
