use crate::models::{DRAW_LABEL, Match, MatchStatus, VoteChoice};

/// Three-way result of a finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub fn from_score(home: u32, away: u32) -> Self {
        if home > away {
            Outcome::Home
        } else if away > home {
            Outcome::Away
        } else {
            Outcome::Draw
        }
    }

    pub fn choice(self) -> VoteChoice {
        match self {
            Outcome::Home => VoteChoice::Home,
            Outcome::Draw => VoteChoice::Draw,
            Outcome::Away => VoteChoice::Away,
        }
    }
}

/// Outcome of `m`, or `None` while it is not finished with a full score.
pub fn match_outcome(m: &Match) -> Option<Outcome> {
    decided_outcome(m.status, m.final_score())
}

pub fn decided_outcome(status: MatchStatus, score: Option<(u32, u32)>) -> Option<Outcome> {
    if status != MatchStatus::Finished {
        return None;
    }
    let (home, away) = score?;
    Some(Outcome::from_score(home, away))
}

/// Label a prediction must carry to be right: a team name or "Draw".
pub fn outcome_label<'a>(home_team: &'a str, away_team: &'a str, outcome: Outcome) -> &'a str {
    match outcome {
        Outcome::Home => home_team,
        Outcome::Away => away_team,
        Outcome::Draw => DRAW_LABEL,
    }
}

/// Correctness of a labelled prediction. `None` means not yet decidable.
pub fn resolve(
    home_team: &str,
    away_team: &str,
    status: MatchStatus,
    score: Option<(u32, u32)>,
    predicted: &str,
) -> Option<bool> {
    let outcome = decided_outcome(status, score)?;
    Some(outcome_label(home_team, away_team, outcome) == predicted)
}

/// Same rule for fan and admin predictions alike.
pub fn resolve_label(m: &Match, predicted: &str) -> Option<bool> {
    resolve(
        &m.home_team.name,
        &m.away_team.name,
        m.status,
        m.final_score(),
        predicted,
    )
}

pub fn resolve_choice(m: &Match, choice: VoteChoice) -> Option<bool> {
    match_outcome(m).map(|outcome| outcome.choice() == choice)
}

pub fn fans_prediction_correct(m: &Match) -> Option<bool> {
    let prediction = m.fans_prediction.as_ref()?;
    resolve_label(m, &prediction.team)
}

pub fn admin_prediction_correct(m: &Match) -> Option<bool> {
    let prediction = m.admin_prediction.as_ref()?;
    resolve_label(m, &prediction.team)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUSES: [MatchStatus; 8] = [
        MatchStatus::Scheduled,
        MatchStatus::Timed,
        MatchStatus::InPlay,
        MatchStatus::Halftime,
        MatchStatus::Paused,
        MatchStatus::Live,
        MatchStatus::Finished,
        MatchStatus::Other,
    ];

    #[test]
    fn undecidable_unless_finished_with_score() {
        for status in STATUSES {
            if status != MatchStatus::Finished {
                assert_eq!(resolve("A", "B", status, Some((2, 1)), "A"), None);
            }
        }
        assert_eq!(resolve("A", "B", MatchStatus::Finished, None, "A"), None);
    }

    #[test]
    fn three_way_rule() {
        let cases = [
            ((2, 1), "A", true),
            ((2, 1), "B", false),
            ((2, 1), "Draw", false),
            ((0, 3), "B", true),
            ((0, 3), "A", false),
            ((1, 1), "Draw", true),
            ((1, 1), "A", false),
            ((0, 0), "B", false),
        ];
        for ((home, away), predicted, expected) in cases {
            assert_eq!(
                resolve("A", "B", MatchStatus::Finished, Some((home, away)), predicted),
                Some(expected),
                "{home}-{away} predicted {predicted}"
            );
        }
    }

    #[test]
    fn choice_rule_matches_label_rule() {
        assert_eq!(
            decided_outcome(MatchStatus::Finished, Some((3, 3))).map(Outcome::choice),
            Some(VoteChoice::Draw)
        );
        assert_eq!(
            decided_outcome(MatchStatus::Finished, Some((1, 4))).map(Outcome::choice),
            Some(VoteChoice::Away)
        );
    }
}
