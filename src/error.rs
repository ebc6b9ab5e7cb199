use std::fmt;

/// Errors from compiling the pattern tables at startup.
///
/// This is the only fallible operation in the crate: the scanner itself never
/// errors on response data (malformed input transitions silently to the
/// terminal state). A process that cannot build its pattern tables cannot
/// scan at all, so callers should treat these as fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The multi-keyword automaton for a vocabulary failed to build.
    Compile {
        /// Which vocabulary ("http-fields" or "html-tags").
        vocab: &'static str,
        /// Underlying build failure.
        reason: String,
    },
    /// The pattern table is too large for its suspended scan positions to
    /// fit the 16-bit cursor slot of a resume context.
    TableTooLarge {
        /// Which vocabulary.
        vocab: &'static str,
    },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile { vocab, reason } => {
                write!(f, "failed to compile {vocab} pattern table: {reason}")
            }
            Self::TableTooLarge { vocab } => {
                write!(f, "{vocab} pattern table too large for a 16-bit resume cursor")
            }
        }
    }
}

impl std::error::Error for PatternError {}
