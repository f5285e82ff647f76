//! Parsers for knowledge-service responses
//!
//! Validation queries must answer with a bare integer; transformation queries
//! must answer with JSON.

pub mod result;
pub mod score;

pub use result::ResultParser;
pub use score::ScoreParser;
