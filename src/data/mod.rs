/// Data layer: token model, file codecs, merging, filtering and output.
///
/// Architecture:
/// ```text
///  training.dat / tokens.xml
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  probe binary codec, then XML codec
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ TokenCollection │  BTreeMap<token, TokenRecord>, message counters
///   └────────────────┘
///        │            │
///        ▼            ▼
///   ┌─────────┐  ┌──────────┐
///   │  merge   │  │  filter   │  sum counts per token / drop rare tokens
///   └─────────┘  └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  data / xml + dtd / text / html / csv
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod merge;
pub mod model;
pub mod writer;
