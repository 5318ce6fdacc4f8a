use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Closed integer interval `[start, end]` over a header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubRange {
    pub start: u32,
    pub end: u32,
}

impl SubRange {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub const fn singleton(value: u32) -> Self {
        Self {
            start: value,
            end: value,
        }
    }

    pub const fn contains(&self, value: u32) -> bool {
        self.start <= value && value <= self.end
    }

    pub const fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

impl Display for SubRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}
