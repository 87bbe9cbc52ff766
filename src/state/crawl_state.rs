/// Crawl lifecycle states
///
/// A crawl starts `Idle`, becomes `Running` once its seeds are enqueued, and ends
/// in exactly one terminal state.
use serde::Serialize;
use std::fmt;

/// Represents the current state of one crawl invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlState {
    // ===== Active States =====
    /// Created, seeds not yet processed
    Idle,

    /// Frontier is being drained
    Running,

    // ===== Terminal States =====
    /// Frontier exhausted or URL budget reached
    Completed,

    /// The consumer closed the event stream
    Cancelled,

    /// An unrecoverable error stopped the crawl
    Failed,
}

impl CrawlState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// `Idle` may fail before it ever runs (invalid request) or be cancelled
    /// before seeding completes; everything else goes through `Running`.
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Idle, Self::Failed)
                | (Self::Idle, Self::Cancelled)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Cancelled)
                | (Self::Running, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!CrawlState::Idle.is_terminal());
        assert!(!CrawlState::Running.is_terminal());

        assert!(CrawlState::Completed.is_terminal());
        assert!(CrawlState::Cancelled.is_terminal());
        assert!(CrawlState::Failed.is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(CrawlState::Idle.can_transition_to(CrawlState::Running));
        assert!(CrawlState::Idle.can_transition_to(CrawlState::Failed));
        assert!(CrawlState::Running.can_transition_to(CrawlState::Completed));
        assert!(CrawlState::Running.can_transition_to(CrawlState::Cancelled));
        assert!(CrawlState::Running.can_transition_to(CrawlState::Failed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [
            CrawlState::Completed,
            CrawlState::Cancelled,
            CrawlState::Failed,
        ] {
            for next in [
                CrawlState::Idle,
                CrawlState::Running,
                CrawlState::Completed,
                CrawlState::Cancelled,
                CrawlState::Failed,
            ] {
                assert!(
                    !terminal.can_transition_to(next),
                    "{} -> {} should be illegal",
                    terminal,
                    next
                );
            }
        }
    }

    #[test]
    fn test_idle_cannot_complete_directly() {
        assert!(!CrawlState::Idle.can_transition_to(CrawlState::Completed));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", CrawlState::Running), "running");
        assert_eq!(format!("{}", CrawlState::Cancelled), "cancelled");
    }
}
