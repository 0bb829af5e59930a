//! Cross-check between the primary history file and the line ledger.

use milestone_core::Sample;

/// Result of reading one encoding of a history.
#[derive(Debug, Clone)]
pub enum Encoding {
    /// File does not exist
    Missing,
    /// File could not be read or parsed
    Unreadable(String),
    /// Parsed samples
    Loaded(Vec<Sample>),
}

/// Outcome of a consistency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyStatus {
    /// Neither encoding exists
    NoHistory,
    /// Both encodings agree on every `(time, view)` pair
    Consistent,
    /// Only the primary file exists
    PrimaryOnly,
    /// Only the ledger exists
    LedgerOnly,
    /// An existing encoding could not be read
    Unreadable(String),
    /// Encodings hold a different number of samples
    LengthMismatch {
        /// Samples in the primary file
        primary: usize,
        /// Samples in the ledger
        ledger: usize,
    },
    /// First index (0-based) whose `time` or `view` differs
    Mismatch {
        /// Index of the first differing sample
        index: usize,
    },
}

impl std::fmt::Display for ConsistencyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsistencyStatus::NoHistory => write!(f, "no history"),
            ConsistencyStatus::Consistent => write!(f, "consistent"),
            ConsistencyStatus::PrimaryOnly => write!(f, "primary file only"),
            ConsistencyStatus::LedgerOnly => write!(f, "ledger only"),
            ConsistencyStatus::Unreadable(e) => write!(f, "unreadable: {}", e),
            ConsistencyStatus::LengthMismatch { primary, ledger } => {
                write!(f, "length mismatch (primary {}, ledger {})", primary, ledger)
            }
            ConsistencyStatus::Mismatch { index } => write!(f, "sample #{} differs", index + 1),
        }
    }
}

/// Check outcome together with the samples recovered from storage.
#[derive(Debug, Clone)]
pub struct ConsistencyReport {
    /// What the check found
    pub status: ConsistencyStatus,
    /// Best available history (primary preferred)
    pub samples: Vec<Sample>,
}

impl ConsistencyReport {
    /// Whether both encodings agree (an absent history counts as consistent).
    pub fn is_consistent(&self) -> bool {
        matches!(self.status, ConsistencyStatus::Consistent | ConsistencyStatus::NoHistory)
    }
}

/// Compare two encodings of the same history.
pub fn compare(primary: Encoding, ledger: Encoding) -> ConsistencyReport {
    use Encoding::*;

    match (primary, ledger) {
        (Missing, Missing) => report(ConsistencyStatus::NoHistory, Vec::new()),
        (Loaded(samples), Missing) => report(ConsistencyStatus::PrimaryOnly, samples),
        (Missing, Loaded(samples)) => report(ConsistencyStatus::LedgerOnly, samples),
        (Unreadable(e), Loaded(samples)) | (Loaded(samples), Unreadable(e)) => {
            report(ConsistencyStatus::Unreadable(e), samples)
        }
        (Unreadable(e), _) | (_, Unreadable(e)) => report(ConsistencyStatus::Unreadable(e), Vec::new()),
        (Loaded(primary), Loaded(ledger)) => {
            if primary.len() != ledger.len() {
                let status = ConsistencyStatus::LengthMismatch {
                    primary: primary.len(),
                    ledger: ledger.len(),
                };
                return report(status, primary);
            }
            let differing = primary
                .iter()
                .zip(ledger.iter())
                .position(|(a, b)| a.view != b.view || a.time != b.time);
            match differing {
                Some(index) => report(ConsistencyStatus::Mismatch { index }, primary),
                None => report(ConsistencyStatus::Consistent, primary),
            }
        }
    }
}

fn report(status: ConsistencyStatus, samples: Vec<Sample>) -> ConsistencyReport {
    ConsistencyReport { status, samples }
}
