//! Counting ballots and picking a winner.

use serde::{Deserialize, Serialize};

use crate::models::voting::VotingSession;

/// Per-option ballot counts, aligned with the session's options by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub counts: Vec<usize>,
}

impl VoteTally {
    pub fn from_session(session: &VotingSession) -> Self {
        let mut counts = vec![0; session.options.len()];
        for &index in session.ballots.values() {
            if let Some(count) = counts.get_mut(index) {
                *count += 1;
            }
        }
        Self { counts }
    }

    /// Index of the most voted option. Ties go to the option that was
    /// offered first. `None` only when there are no options at all.
    pub fn winner(&self) -> Option<usize> {
        self.counts
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, usize)>, (index, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((index, count)),
            })
            .map(|(index, _)| index)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}
