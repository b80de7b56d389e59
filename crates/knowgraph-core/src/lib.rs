pub mod config;
pub mod error;
pub mod hash;
pub mod text;
pub mod traits;
pub mod types;
pub mod walk;

pub use config::{
    GraphConfig, IgnoreRules, MonitorConfig, ResponseCacheConfig, SuggestionThresholds,
    DEFAULT_IGNORE_PATTERNS,
};
pub use error::*;
pub use hash::sha256_hex;
pub use text::{overlap_coefficient, significant_keywords, token_set, tokenize};
pub use traits::*;
pub use types::*;
pub use walk::walk_files;
