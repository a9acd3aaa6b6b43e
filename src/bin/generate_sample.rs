use std::path::PathBuf;

use bayes_junk_tool::codec::binary::DEFAULT_FILE_NAME;
use bayes_junk_tool::{write_token_file, OutputFormat, TokenCollection, TokenRecord, TokenSet};

const GOOD_WORDS: [&str; 12] = [
    "meeting", "agenda", "invoice", "lunch", "report", "thanks", "project", "review", "schedule",
    "attached", "minutes", "weekend",
];

const BAD_WORDS: [&str; 12] = [
    "winner", "viagra", "lottery", "cash", "free", "unsubscribe", "offer", "prize", "urgent",
    "bonus", "casino", "guaranteed",
];

const SHARED_WORDS: [&str; 6] = ["the", "you", "click", "today", "please", "money"];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    /// Uniform integer in `0..bound`.
    fn below(&mut self, bound: u32) -> u32 {
        (self.next_u64() % u64::from(bound.max(1))) as u32
    }
}

/// Simulate training on `good_messages` + `bad_messages` messages drawn from
/// small vocabularies and count how often each word was seen.
fn simulate(rng: &mut SimpleRng, good_messages: u32, bad_messages: u32) -> TokenCollection {
    let mut records = TokenSet::new();
    let sides = [
        (&GOOD_WORDS, good_messages, true),
        (&BAD_WORDS, bad_messages, false),
    ];
    for (vocabulary, messages, good) in sides {
        for _ in 0..messages {
            let words = 3 + rng.below(6);
            for _ in 0..words {
                let pool: &[&str] = if rng.below(4) == 0 { &SHARED_WORDS } else { vocabulary };
                let word = pool[rng.below(pool.len() as u32) as usize];
                let seen = if good {
                    TokenRecord::good(word, 1)
                } else {
                    TokenRecord::bad(word, 1)
                };
                records
                    .entry(word.to_string())
                    .and_modify(|existing| existing.accumulate(&seen))
                    .or_insert(seen);
            }
        }
    }
    TokenCollection::from_parts(good_messages, bad_messages, records)
}

fn main() {
    let mut rng = SimpleRng::new(42);
    let collection = simulate(&mut rng, 250, 180);

    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_NAME));
    let format = OutputFormat::from_path(&output_path).unwrap_or(OutputFormat::Data);
    if let Err(err) = write_token_file(&collection, &output_path, format) {
        eprintln!("Failed to write {}: {err}", output_path.display());
        std::process::exit(1);
    }

    println!(
        "Wrote {} tokens ({} good / {} bad messages) to {}",
        collection.len(),
        collection.good_message_count(),
        collection.bad_message_count(),
        output_path.display()
    );
}
