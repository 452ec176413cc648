//! Core Module - Business Logic
//!
//! Source fan-out, score normalization and lookup orchestration.

pub mod aggregator;
pub mod lookup;
pub mod threat_score;

pub use aggregator::*;
pub use lookup::*;
pub use threat_score::*;
