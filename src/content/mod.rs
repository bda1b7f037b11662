//! Content stream tokens and the watermark filter

pub mod filter;
pub mod token;

// Re-export commonly used items
pub use filter::{filter_tokens, CandidateSet, FilterStats, Filtered};
pub use token::{assemble, encode_content, tokenize, Token};
