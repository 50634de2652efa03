//! Line records and the composite ordering.

use std::cmp::Ordering;
use std::fmt;

/// A single input line of the shape `N. W1 W2 … Wk`, split into the numeric
/// prefix (everything up to the first space) and the word suffix after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    prefix: String,
    suffix: String,
}

impl Record {
    /// Splits a line once on the first space. A line without any space
    /// becomes a record holding the whole line as its prefix and an empty
    /// suffix.
    pub fn parse(line: &str) -> Record {
        match line.split_once(' ') {
            Some((prefix, suffix)) => Record {
                prefix: prefix.to_owned(),
                suffix: suffix.to_owned(),
            },
            None => Record {
                prefix: line.to_owned(),
                suffix: String::new(),
            },
        }
    }

    /// The numeric prefix, dot included.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Everything after the first space.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

/// The composite ordering shared by the in-memory chunk sort and the stream
/// merge: suffix bytes ascending first, prefix bytes as the tie-breaker.
/// Byte-ordinal, no locale or case folding.
pub fn compare(a: &Record, b: &Record) -> Ordering {
    a.suffix
        .as_bytes()
        .cmp(b.suffix.as_bytes())
        .then_with(|| a.prefix.as_bytes().cmp(b.prefix.as_bytes()))
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Record {
    /// Restores the original line shape. A record without a suffix prints
    /// its prefix alone, with no trailing separator.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.suffix.is_empty() {
            write!(f, "{}", self.prefix)
        } else {
            write!(f, "{} {}", self.prefix, self.suffix)
        }
    }
}
