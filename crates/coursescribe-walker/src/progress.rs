use crate::identity::LectureIdentity;
use std::collections::HashSet;

/// Lectures already handled in this walk.
///
/// Keyed by full title, which survives redirects and refreshes that change the
/// URL. Visited URLs are kept alongside for reporting only. Both sets only grow.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    identities: HashSet<String>,
    locations: HashSet<String>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this lecture was already handled. The URL is not consulted: a
    /// single-page player can show a new lecture under the old URL.
    pub fn is_processed(&self, identity: &LectureIdentity, _url: &str) -> bool {
        self.identities.contains(&identity.full_title)
    }

    pub fn mark_processed(&mut self, identity: &LectureIdentity, url: &str) {
        self.identities.insert(identity.full_title.clone());
        self.locations.insert(url.to_string());
    }

    pub fn has_visited(&self, url: &str) -> bool {
        self.locations.contains(url)
    }

    /// Number of distinct lectures handled.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> LectureIdentity {
        LectureIdentity::from_title(s).unwrap()
    }

    #[test]
    fn test_mark_then_processed() {
        let mut tracker = ProgressTracker::new();
        let lecture = id("12. Replication");
        assert!(!tracker.is_processed(&lecture, "https://x.test/lecture/12"));
        tracker.mark_processed(&lecture, "https://x.test/lecture/12");
        assert!(tracker.is_processed(&lecture, "https://x.test/lecture/12"));
        assert!(tracker.has_visited("https://x.test/lecture/12"));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_identity_wins_over_url() {
        let mut tracker = ProgressTracker::new();
        tracker.mark_processed(&id("12. Replication"), "https://x.test/lecture/12");
        // same lecture reached through a redirect
        assert!(tracker.is_processed(&id("12. Replication"), "https://x.test/lecture/12?start=0"));
        // different lecture under the old URL
        assert!(!tracker.is_processed(&id("13. Sharding"), "https://x.test/lecture/12"));
    }

    #[test]
    fn test_marking_twice_is_idempotent() {
        let mut tracker = ProgressTracker::new();
        tracker.mark_processed(&id("1. Intro"), "https://x.test/lecture/1");
        tracker.mark_processed(&id("1. Intro"), "https://x.test/lecture/1");
        assert_eq!(tracker.len(), 1);
    }
}
