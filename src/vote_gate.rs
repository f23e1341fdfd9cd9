use std::collections::HashSet;

use crate::api::{ApiError, VoteSink};
use crate::models::{Match, MatchStatus, VoteChoice, VotePercentages};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoteRejection {
    #[error("Please log in to vote")]
    NotLoggedIn,
    #[error("Voting is closed for this match ({0})")]
    VotingClosed(MatchStatus),
    #[error("You have already voted for this match")]
    AlreadyVoted,
    #[error("No match selected")]
    NoMatch,
}

#[derive(Debug, thiserror::Error)]
pub enum VoteError {
    #[error(transparent)]
    Rejected(#[from] VoteRejection),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Session-scoped record of which matches this user has voted on.
///
/// Nothing here is persisted: a restart forgets it and the server becomes the
/// only guard against duplicates.
#[derive(Debug, Clone, Default)]
pub struct VoteGate {
    voted: HashSet<String>,
    pending: HashSet<String>,
}

impl VoteGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_voted(&self, match_id: &str) -> bool {
        self.voted.contains(match_id)
    }

    pub fn is_pending(&self, match_id: &str) -> bool {
        self.pending.contains(match_id)
    }

    /// Checks the local preconditions without changing anything.
    pub fn check(&self, logged_in: bool, m: &Match) -> Result<(), VoteRejection> {
        if !logged_in {
            return Err(VoteRejection::NotLoggedIn);
        }
        if !m.status.is_open_for_votes() {
            return Err(VoteRejection::VotingClosed(m.status));
        }
        if self.voted.contains(&m.id) || self.pending.contains(&m.id) {
            return Err(VoteRejection::AlreadyVoted);
        }
        Ok(())
    }

    /// Checks preconditions and marks the match in flight.
    pub fn admit(&mut self, logged_in: bool, m: &Match) -> Result<(), VoteRejection> {
        self.check(logged_in, m)?;
        self.pending.insert(m.id.clone());
        Ok(())
    }

    pub fn confirm(&mut self, match_id: &str) {
        self.pending.remove(match_id);
        self.voted.insert(match_id.to_string());
    }

    /// Submission failed; the user may try again.
    pub fn abandon(&mut self, match_id: &str) {
        self.pending.remove(match_id);
    }

    pub fn clear(&mut self) {
        self.voted.clear();
        self.pending.clear();
    }

    /// Full round trip: gate, submit, then merge the returned split into `m`.
    pub fn cast_vote(
        &mut self,
        sink: &impl VoteSink,
        logged_in: bool,
        m: &mut Match,
        choice: VoteChoice,
    ) -> Result<VotePercentages, VoteError> {
        self.admit(logged_in, m)?;
        match sink.submit_vote(&m.id, choice) {
            Ok(percentages) => {
                self.confirm(&m.id);
                m.vote_percentages = Some(percentages);
                Ok(percentages)
            }
            Err(err) => {
                self.abandon(&m.id);
                Err(VoteError::Api(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::api::ApiResult;
    use crate::models::{Competition, Team};

    struct CountingSink {
        calls: Cell<usize>,
        fail: bool,
    }

    impl CountingSink {
        fn new(fail: bool) -> Self {
            Self {
                calls: Cell::new(0),
                fail,
            }
        }
    }

    impl VoteSink for CountingSink {
        fn submit_vote(&self, _match_id: &str, _choice: VoteChoice) -> ApiResult<VotePercentages> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(ApiError::Status {
                    status: 500,
                    message: "Failed to submit vote".to_string(),
                });
            }
            Ok(VotePercentages {
                home: 100.0,
                draw: 0.0,
                away: 0.0,
            })
        }
    }

    fn open_match(id: &str, status: MatchStatus) -> Match {
        Match {
            id: id.to_string(),
            competition: Competition {
                id: "PL".to_string(),
                name: "Premier League".to_string(),
                emblem: None,
            },
            home_team: Team {
                name: "A".to_string(),
                crest: None,
            },
            away_team: Team {
                name: "B".to_string(),
                crest: None,
            },
            utc_date: String::new(),
            status,
            score: None,
            fans_prediction: None,
            admin_prediction: None,
            vote_percentages: None,
        }
    }

    #[test]
    fn second_vote_is_rejected_without_network_call() {
        let sink = CountingSink::new(false);
        let mut gate = VoteGate::new();
        let mut m = open_match("42", MatchStatus::Timed);

        gate.cast_vote(&sink, true, &mut m, VoteChoice::Home).unwrap();
        assert_eq!(sink.calls.get(), 1);
        assert_eq!(m.vote_percentages.map(|p| p.home), Some(100.0));

        let err = gate
            .cast_vote(&sink, true, &mut m, VoteChoice::Away)
            .unwrap_err();
        assert!(matches!(err, VoteError::Rejected(VoteRejection::AlreadyVoted)));
        assert_eq!(sink.calls.get(), 1);
    }

    #[test]
    fn finished_match_is_rejected() {
        let sink = CountingSink::new(false);
        let mut gate = VoteGate::new();
        let mut m = open_match("7", MatchStatus::Finished);
        let err = gate
            .cast_vote(&sink, true, &mut m, VoteChoice::Draw)
            .unwrap_err();
        assert!(matches!(
            err,
            VoteError::Rejected(VoteRejection::VotingClosed(MatchStatus::Finished))
        ));
        assert_eq!(sink.calls.get(), 0);
    }

    #[test]
    fn anonymous_user_is_rejected() {
        let sink = CountingSink::new(false);
        let mut gate = VoteGate::new();
        let mut m = open_match("7", MatchStatus::Scheduled);
        let err = gate
            .cast_vote(&sink, false, &mut m, VoteChoice::Draw)
            .unwrap_err();
        assert!(matches!(err, VoteError::Rejected(VoteRejection::NotLoggedIn)));
        assert_eq!(sink.calls.get(), 0);
    }

    #[test]
    fn failed_submission_can_be_retried() {
        let mut gate = VoteGate::new();
        let mut m = open_match("9", MatchStatus::Scheduled);
        assert!(gate
            .cast_vote(&CountingSink::new(true), true, &mut m, VoteChoice::Home)
            .is_err());
        assert!(!gate.has_voted("9"));
        assert!(!gate.is_pending("9"));

        let sink = CountingSink::new(false);
        gate.cast_vote(&sink, true, &mut m, VoteChoice::Home).unwrap();
        assert!(gate.has_voted("9"));
    }

    #[test]
    fn in_flight_vote_blocks_duplicates() {
        let mut gate = VoteGate::new();
        let m = open_match("5", MatchStatus::Scheduled);
        gate.admit(true, &m).unwrap();
        assert_eq!(gate.admit(true, &m), Err(VoteRejection::AlreadyVoted));
        gate.abandon("5");
        assert!(gate.admit(true, &m).is_ok());
    }
}
