use std::path::PathBuf;
use thiserror::Error;

/// Recoverable problems found while processing input. None of these abort a job on their own; the
/// caller decides whether to log and skip, or to escalate.
#[derive(Debug, Error)]
pub enum Anomaly {
    #[error("malformed {what}: {reason}")]
    MalformedInput { what: &'static str, reason: String },
    #[error("tick {hash:016x} was already processed")]
    DuplicateTick { hash: u64 },
    #[error("unable to resolve {kind} {name:?}")]
    UnresolvedReference { kind: &'static str, name: String },
    #[error("reference data unavailable: {0}")]
    UpstreamFetchFailure(String),
    #[error("unable to use {}: {reason}", path.display())]
    PersistenceConflict { path: PathBuf, reason: String },
}

impl Anomaly {
    pub fn malformed(what: &'static str, reason: impl ToString) -> Anomaly {
        Anomaly::MalformedInput {
            what,
            reason: reason.to_string(),
        }
    }

    pub fn unresolved(kind: &'static str, name: impl Into<String>) -> Anomaly {
        Anomaly::UnresolvedReference {
            kind,
            name: name.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::Anomaly;

    #[test]
    fn test_display() {
        assert_eq!(
            Anomaly::DuplicateTick { hash: 0xbeef }.to_string(),
            "tick 000000000000beef was already processed"
        );
        assert_eq!(
            Anomaly::unresolved("hitter", "Fish Summer").to_string(),
            "unable to resolve hitter \"Fish Summer\""
        );
        assert_eq!(
            Anomaly::malformed("tick", "expected value").to_string(),
            "malformed tick: expected value"
        );
    }
}
