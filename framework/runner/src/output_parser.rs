//! Extraction of the active user count from raw console output.
//!
//! The parser only ever sees the chunk handed to it. A phrase such as `active: 12` that is split
//! across two reads of the output stream is not recognised in either chunk and the update is
//! missed. There is no buffering across chunks.

use regex::Regex;

/// Default matchers, in priority order.
///
/// Gatling prints progress lines such as `> active: 12 / done: 3`. The alternative forms cover
/// other summary layouts. Order matters: the first matcher that yields a count wins.
pub const DEFAULT_ACTIVE_USER_PATTERNS: [&str; 3] = [
    r"active:\s+(\d+)",
    r"(\d+)\s+active",
    r"users\s+active:\s+(\d+)",
];

#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("invalid active user pattern '{pattern}': {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("active user pattern '{0}' has no capture group for the count")]
    MissingCaptureGroup(String),
}

/// Stateless, ordered list of matchers for the active user count.
#[derive(Debug, Clone)]
pub struct OutputParser {
    matchers: Vec<Regex>,
}

impl OutputParser {
    /// Build a parser from an ordered list of patterns. The first capture group of each pattern
    /// must capture the count.
    pub fn with_patterns<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                let regex = Regex::new(pattern).map_err(|source| PatternError::Invalid {
                    pattern: pattern.to_string(),
                    source,
                })?;
                if regex.captures_len() < 2 {
                    return Err(PatternError::MissingCaptureGroup(pattern.to_string()));
                }
                Ok(regex)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { matchers })
    }

    /// Find the active user count in `chunk`.
    ///
    /// Returns [None] when no matcher finds a count, which callers must not confuse with a
    /// reported count of zero. A captured number too large for a `u64` does not count as a match.
    pub fn extract(&self, chunk: &str) -> Option<u64> {
        self.matchers.iter().find_map(|matcher| {
            matcher
                .captures(chunk)
                .and_then(|captures| captures.get(1))
                .and_then(|count| count.as_str().parse::<u64>().ok())
        })
    }
}

impl Default for OutputParser {
    fn default() -> Self {
        Self::with_patterns(DEFAULT_ACTIVE_USER_PATTERNS)
            .expect("default active user patterns are valid")
    }
}
