use std::collections::HashSet;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accepted,
    /// Same key as the last accepted event inside the cooldown, or a
    /// submission id that was already accepted.
    Duplicate,
    /// A previous event is still being relayed.
    InProgress,
}

/// Stops the same solve from being relayed repeatedly while the verdict stays
/// on screen. Time is always passed in, never read.
///
/// Submissions the judge numbered are remembered for the suppressor's whole
/// life; everything else falls back to the per-key cooldown.
#[derive(Debug)]
pub struct Suppressor {
    cooldown: Duration,
    last: Option<(String, Instant)>,
    in_progress_since: Option<Instant>,
    accepted_ids: HashSet<String>,
}

impl Suppressor {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last: None,
            in_progress_since: None,
            accepted_ids: HashSet::new(),
        }
    }

    /// Like [`Suppressor::check`], but a submission id that was accepted once
    /// is a duplicate forever, regardless of the cooldown.
    pub fn check_submission(&mut self, submission_id: Option<&str>, key: &str, now: Instant) -> Decision {
        let Some(id) = submission_id else {
            return self.check(key, now);
        };
        if self.accepted_ids.contains(id) {
            return Decision::Duplicate;
        }
        let decision = self.check(key, now);
        if decision == Decision::Accepted {
            self.accepted_ids.insert(id.to_string());
        }
        decision
    }

    /// Decides on `key` at `now`. An accepted key is recorded and marks a
    /// relay as in progress until [`Suppressor::complete`] or the cooldown passes.
    pub fn check(&mut self, key: &str, now: Instant) -> Decision {
        if let Some(since) = self.in_progress_since {
            if now.saturating_duration_since(since) < self.cooldown {
                return Decision::InProgress;
            }
            tracing::debug!("In-progress flag timed out");
            self.in_progress_since = None;
        }

        if let Some((last_key, at)) = &self.last {
            if last_key == key && now.saturating_duration_since(*at) < self.cooldown {
                return Decision::Duplicate;
            }
        }

        self.last = Some((key.to_string(), now));
        self.in_progress_since = Some(now);
        Decision::Accepted
    }

    pub fn complete(&mut self) {
        self.in_progress_since = None;
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress_since.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(10);

    #[test]
    fn same_key_within_cooldown_is_duplicate() {
        let t0 = Instant::now();
        let mut s = Suppressor::new(COOLDOWN);
        assert_eq!(s.check("two-sum", t0), Decision::Accepted);
        s.complete();
        assert_eq!(s.check("two-sum", t0 + Duration::from_secs(3)), Decision::Duplicate);
        assert_eq!(s.check("two-sum", t0 + Duration::from_secs(10)), Decision::Accepted);
    }

    #[test]
    fn in_progress_blocks_every_key() {
        let t0 = Instant::now();
        let mut s = Suppressor::new(COOLDOWN);
        assert_eq!(s.check("a", t0), Decision::Accepted);
        assert_eq!(s.check("b", t0 + Duration::from_secs(1)), Decision::InProgress);
        s.complete();
        assert_eq!(s.check("b", t0 + Duration::from_secs(2)), Decision::Accepted);
    }

    #[test]
    fn in_progress_times_out() {
        let t0 = Instant::now();
        let mut s = Suppressor::new(COOLDOWN);
        assert_eq!(s.check("a", t0), Decision::Accepted);
        assert!(s.in_progress());
        assert_eq!(s.check("b", t0 + COOLDOWN), Decision::Accepted);
    }

    #[test]
    fn duplicate_does_not_refresh_window() {
        let t0 = Instant::now();
        let mut s = Suppressor::new(COOLDOWN);
        s.check("a", t0);
        s.complete();
        assert_eq!(s.check("a", t0 + Duration::from_secs(9)), Decision::Duplicate);
        assert_eq!(s.check("a", t0 + Duration::from_secs(11)), Decision::Accepted);
    }

    #[test]
    fn accepted_submission_id_never_repeats() {
        let t0 = Instant::now();
        let mut s = Suppressor::new(COOLDOWN);
        assert_eq!(s.check_submission(Some("98765"), "a", t0), Decision::Accepted);
        s.complete();
        let much_later = t0 + COOLDOWN * 6;
        assert_eq!(s.check_submission(Some("98765"), "a", much_later), Decision::Duplicate);
        assert_eq!(s.check_submission(Some("98766"), "a", much_later), Decision::Accepted);
    }

    #[test]
    fn suppressed_submission_id_is_not_remembered() {
        let t0 = Instant::now();
        let mut s = Suppressor::new(COOLDOWN);
        assert_eq!(s.check_submission(None, "a", t0), Decision::Accepted);
        assert_eq!(
            s.check_submission(Some("7"), "a", t0 + Duration::from_secs(1)),
            Decision::InProgress
        );
        s.complete();
        assert_eq!(
            s.check_submission(Some("7"), "a", t0 + COOLDOWN),
            Decision::Accepted
        );
    }
}
