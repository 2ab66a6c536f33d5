//! Source location tracking

use serde::{Deserialize, Serialize};

/// A span represents a range in the source code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start offset (in chars)
    pub start: usize,
    /// End offset (exclusive)
    pub end: usize,
    /// 1-based line of the first character
    pub line: u32,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize, line: u32) -> Self {
        Self { start, end, line }
    }
}
