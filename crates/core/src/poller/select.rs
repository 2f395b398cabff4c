//! Eligible-session selection.

use std::collections::HashSet;

use crate::services::SessionDescriptor;

/// Which selection tier matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibilityTier {
    /// Session has not started yet.
    NotStarted,
    /// Session has started but nobody has joined.
    EmptyStarted,
}

impl EligibilityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::EmptyStarted => "empty_started",
        }
    }
}

/// Pick the session to claim, if any.
///
/// Tiers are evaluated in order and the first non-empty tier wins; within a
/// tier the first session in input order is chosen. Processed sessions never
/// match.
pub fn select_eligible<'a>(
    sessions: &'a [SessionDescriptor],
    processed: &HashSet<String>,
) -> Option<(&'a SessionDescriptor, EligibilityTier)> {
    let fresh = |s: &&SessionDescriptor| !processed.contains(&s.session_id);

    if let Some(session) = sessions.iter().filter(fresh).find(|s| !s.started) {
        return Some((session, EligibilityTier::NotStarted));
    }

    sessions
        .iter()
        .filter(fresh)
        .find(|s| s.started && s.players == 0)
        .map(|s| (s, EligibilityTier::EmptyStarted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::session;

    #[test]
    fn test_not_started_preferred_regardless_of_order() {
        let sessions = vec![
            session("empty", true, 0),
            session("busy", true, 12),
            session("fresh", false, 4),
        ];
        let (picked, tier) = select_eligible(&sessions, &HashSet::new()).unwrap();
        assert_eq!(picked.session_id, "fresh");
        assert_eq!(tier, EligibilityTier::NotStarted);
    }

    #[test]
    fn test_first_in_input_order_within_tier() {
        let sessions = vec![session("a", false, 0), session("b", false, 0)];
        let (picked, _) = select_eligible(&sessions, &HashSet::new()).unwrap();
        assert_eq!(picked.session_id, "a");
    }

    #[test]
    fn test_falls_back_to_empty_started() {
        let sessions = vec![session("busy", true, 3), session("empty", true, 0)];
        let (picked, tier) = select_eligible(&sessions, &HashSet::new()).unwrap();
        assert_eq!(picked.session_id, "empty");
        assert_eq!(tier, EligibilityTier::EmptyStarted);
    }

    #[test]
    fn test_processed_sessions_are_skipped() {
        let sessions = vec![session("fresh", false, 0), session("empty", true, 0)];
        let processed: HashSet<String> = ["fresh".to_string()].into_iter().collect();
        let (picked, tier) = select_eligible(&sessions, &processed).unwrap();
        assert_eq!(picked.session_id, "empty");
        assert_eq!(tier, EligibilityTier::EmptyStarted);
    }

    #[test]
    fn test_no_eligible_session() {
        let sessions = vec![session("busy", true, 3)];
        assert!(select_eligible(&sessions, &HashSet::new()).is_none());
        assert!(select_eligible(&[], &HashSet::new()).is_none());
    }
}
