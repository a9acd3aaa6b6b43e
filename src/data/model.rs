use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TokenRecord – one token and its occurrence counts
// ---------------------------------------------------------------------------

/// A single token tracked by the junk-mail filter.
///
/// The token text is the identity: two records with the same text are the
/// same entity regardless of their counts. The text cannot be changed once a
/// record exists, only the counts can.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    token: String,
    /// Occurrences in non-junk (good) messages.
    pub good_count: u32,
    /// Occurrences in junk (bad) messages.
    pub bad_count: u32,
}

impl TokenRecord {
    pub fn new(token: impl Into<String>, good_count: u32, bad_count: u32) -> Self {
        Self {
            token: token.into(),
            good_count,
            bad_count,
        }
    }

    /// A record seen only in good messages.
    pub fn good(token: impl Into<String>, count: u32) -> Self {
        Self::new(token, count, 0)
    }

    /// A record seen only in bad messages.
    pub fn bad(token: impl Into<String>, count: u32) -> Self {
        Self::new(token, 0, count)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Add another record's counts onto this one.
    pub fn accumulate(&mut self, other: &TokenRecord) {
        self.good_count = self.good_count.saturating_add(other.good_count);
        self.bad_count = self.bad_count.saturating_add(other.bad_count);
    }
}

impl fmt::Display for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} - {} good tokens, {} bad tokens]",
            self.token, self.good_count, self.bad_count
        )
    }
}

/// Ordered set of records keyed by token text.
pub type TokenSet = BTreeMap<String, TokenRecord>;

/// Insert `record` unless its key is already present (set semantics: the
/// first occurrence wins). Returns `false` when the record was dropped.
pub fn insert_first(set: &mut TokenSet, record: TokenRecord) -> bool {
    if set.contains_key(record.token()) {
        return false;
    }
    set.insert(record.token.clone(), record);
    true
}

// ---------------------------------------------------------------------------
// TokenCollection – the complete contents of one training file
// ---------------------------------------------------------------------------

/// All statistics from one training file: message counters plus the
/// deduplicated, key-ordered token records.
///
/// `num_good_tokens` / `num_bad_tokens` are cached and recomputed by
/// [`TokenCollection::validate`]; every mutating method here calls it before
/// returning. `revision` increases whenever the record set changes shape so
/// views built over the collection can tell they are stale.
#[derive(Debug, Clone, Default)]
pub struct TokenCollection {
    good_message_count: u32,
    bad_message_count: u32,
    records: TokenSet,
    num_good_tokens: usize,
    num_bad_tokens: usize,
    revision: u64,
}

impl TokenCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from its parts and compute the derived counts.
    pub fn from_parts(good_message_count: u32, bad_message_count: u32, records: TokenSet) -> Self {
        let mut collection = Self {
            good_message_count,
            bad_message_count,
            records,
            ..Self::default()
        };
        collection.validate();
        collection
    }

    /// Build a collection from a list of records; later duplicates are dropped.
    pub fn from_records<I>(good_message_count: u32, bad_message_count: u32, records: I) -> Self
    where
        I: IntoIterator<Item = TokenRecord>,
    {
        let mut set = TokenSet::new();
        for record in records {
            insert_first(&mut set, record);
        }
        Self::from_parts(good_message_count, bad_message_count, set)
    }

    /// Recount the tokens with a positive good / bad count.
    pub fn validate(&mut self) {
        let (good, bad) = count_positive(&self.records);
        self.num_good_tokens = good;
        self.num_bad_tokens = bad;
    }

    pub fn good_message_count(&self) -> u32 {
        self.good_message_count
    }

    pub fn bad_message_count(&self) -> u32 {
        self.bad_message_count
    }

    pub fn set_good_message_count(&mut self, count: u32) {
        self.good_message_count = count;
    }

    pub fn set_bad_message_count(&mut self, count: u32) {
        self.bad_message_count = count;
    }

    /// Number of records with `good_count > 0`.
    pub fn num_good_tokens(&self) -> usize {
        self.num_good_tokens
    }

    /// Number of records with `bad_count > 0`.
    pub fn num_bad_tokens(&self) -> usize {
        self.num_bad_tokens
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ascending token order.
    pub fn records(&self) -> impl Iterator<Item = &TokenRecord> + '_ {
        self.records.values()
    }

    pub fn token_set(&self) -> &TokenSet {
        &self.records
    }

    pub fn into_token_set(self) -> TokenSet {
        self.records
    }

    pub fn get(&self, token: &str) -> Option<&TokenRecord> {
        self.records.get(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.records.contains_key(token)
    }

    /// Insert a new record. An existing record with the same token is left
    /// untouched and `false` is returned.
    pub fn insert(&mut self, record: TokenRecord) -> bool {
        let inserted = insert_first(&mut self.records, record);
        if inserted {
            self.touch();
        }
        inserted
    }

    pub fn remove(&mut self, token: &str) -> Option<TokenRecord> {
        let removed = self.records.remove(token);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Keep only the records for which `keep` returns true; returns how many
    /// were removed.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&TokenRecord) -> bool,
    {
        let before = self.records.len();
        self.records.retain(|_, record| keep(record));
        let removed = before - self.records.len();
        if removed > 0 {
            self.touch();
        } else {
            self.validate();
        }
        removed
    }

    /// Change the good count of an existing token. Returns `false` when the
    /// token is unknown.
    pub fn set_good_count(&mut self, token: &str, count: u32) -> bool {
        self.edit(token, |record| record.good_count = count)
    }

    /// Change the bad count of an existing token. Returns `false` when the
    /// token is unknown.
    pub fn set_bad_count(&mut self, token: &str, count: u32) -> bool {
        self.edit(token, |record| record.bad_count = count)
    }

    /// Replace the whole record set (e.g. with a merge result).
    pub fn replace_token_set(&mut self, records: TokenSet) {
        self.records = records;
        self.touch();
    }

    /// Move the records out, leaving the collection empty. Callers put a new
    /// set back with [`TokenCollection::replace_token_set`].
    pub(crate) fn take_token_set(&mut self) -> TokenSet {
        std::mem::take(&mut self.records)
    }

    /// Remove every record; message counters are kept.
    pub fn clear(&mut self) {
        self.records.clear();
        self.touch();
    }

    fn edit<F>(&mut self, token: &str, apply: F) -> bool
    where
        F: FnOnce(&mut TokenRecord),
    {
        match self.records.get_mut(token) {
            Some(record) => {
                apply(record);
                self.validate();
                true
            }
            None => false,
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.validate();
    }
}

/// Equality covers the message counters and the records; the revision is a
/// bookkeeping detail.
impl PartialEq for TokenCollection {
    fn eq(&self, other: &Self) -> bool {
        self.good_message_count == other.good_message_count
            && self.bad_message_count == other.bad_message_count
            && self.records == other.records
    }
}

impl Eq for TokenCollection {}

/// `(records with good_count > 0, records with bad_count > 0)`.
pub fn count_positive(records: &TokenSet) -> (usize, usize) {
    records.values().fold((0, 0), |(good, bad), record| {
        (
            good + usize::from(record.good_count > 0),
            bad + usize::from(record.bad_count > 0),
        )
    })
}
