use std::collections::HashMap;

use crate::api::{ApiResult, VoteHistorySource};
use crate::models::{Match, UserProfile, Vote, VoteChoice};
use crate::outcome::resolve_choice;

#[derive(Debug, Clone, PartialEq)]
pub struct LeagueStat {
    pub competition_id: String,
    pub name: String,
    pub logo: Option<String>,
    /// Votes on finished matches in this league.
    pub total: u32,
    pub correct: u32,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteRecord {
    pub match_id: String,
    pub choice: VoteChoice,
    /// `None` while the match is undecided or its details are missing.
    pub correct: Option<bool>,
    pub fixture: Option<Match>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccuracyReport {
    pub leagues: Vec<LeagueStat>,
    pub history: Vec<VoteRecord>,
    pub total_votes: usize,
    pub decided: u32,
    pub correct: u32,
    pub overall_accuracy: f64,
}

pub fn accuracy_pct(correct: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(correct) / f64::from(total) * 100.0
    }
}

/// Folds a user's votes into per-league and overall accuracy.
///
/// Correctness is judged on the vote's own choice. A league appears as soon as
/// one of its matches is known, even with nothing decided yet (0 of 0).
pub fn aggregate(votes: &[Vote], fixtures: &HashMap<String, Match>) -> AccuracyReport {
    let mut leagues: Vec<LeagueStat> = Vec::new();
    let mut history = Vec::with_capacity(votes.len());
    let mut decided = 0u32;
    let mut correct = 0u32;

    for vote in votes {
        let fixture = fixtures.get(&vote.match_id);
        let result = fixture.and_then(|m| resolve_choice(m, vote.vote));

        if let Some(m) = fixture {
            let idx = match leagues
                .iter()
                .position(|l| l.competition_id == m.competition.id)
            {
                Some(idx) => idx,
                None => {
                    leagues.push(LeagueStat {
                        competition_id: m.competition.id.clone(),
                        name: m.competition.name.clone(),
                        logo: m.competition.emblem.clone(),
                        total: 0,
                        correct: 0,
                        accuracy: 0.0,
                    });
                    leagues.len() - 1
                }
            };
            if let Some(hit) = result {
                leagues[idx].total += 1;
                decided += 1;
                if hit {
                    leagues[idx].correct += 1;
                    correct += 1;
                }
            }
        }

        history.push(VoteRecord {
            match_id: vote.match_id.clone(),
            choice: vote.vote,
            correct: result,
            fixture: fixture.cloned(),
        });
    }

    for league in &mut leagues {
        league.accuracy = accuracy_pct(league.correct, league.total);
    }
    // sort_by is stable, so ties keep first-appearance order.
    leagues.sort_by(|a, b| b.accuracy.total_cmp(&a.accuracy));

    AccuracyReport {
        leagues,
        history,
        total_votes: votes.len(),
        decided,
        correct,
        overall_accuracy: accuracy_pct(correct, decided),
    }
}

/// Loads the profile, batch-fetches every voted fixture, and aggregates.
///
/// Fixtures that fail to load are reported as errors and their votes stay
/// pending in the history.
pub fn load_profile_report(
    source: &impl VoteHistorySource,
) -> ApiResult<(UserProfile, AccuracyReport, Vec<(String, String)>)> {
    let profile = source.get_profile()?;
    let ids: Vec<String> = profile.votes.iter().map(|v| v.match_id.clone()).collect();
    let details = source.get_many_match_details(&ids);
    let report = aggregate(&profile.votes, &details.found);
    Ok((profile, report, details.errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Competition, MatchStatus, Score, ScoreLine, Team};

    fn finished(id: &str, league: &str, home: u32, away: u32) -> Match {
        let mut m = unfinished(id, league);
        m.status = MatchStatus::Finished;
        m.score = Some(Score {
            full_time: Some(ScoreLine {
                home: Some(home),
                away: Some(away),
            }),
        });
        m
    }

    fn unfinished(id: &str, league: &str) -> Match {
        Match {
            id: id.to_string(),
            competition: Competition {
                id: league.to_string(),
                name: league.to_string(),
                emblem: None,
            },
            home_team: Team {
                name: "H".to_string(),
                crest: None,
            },
            away_team: Team {
                name: "A".to_string(),
                crest: None,
            },
            utc_date: String::new(),
            status: MatchStatus::Timed,
            score: None,
            fans_prediction: None,
            admin_prediction: None,
            vote_percentages: None,
        }
    }

    fn vote(match_id: &str, choice: VoteChoice) -> Vote {
        Vote {
            match_id: match_id.to_string(),
            vote: choice,
        }
    }

    fn index(matches: Vec<Match>) -> HashMap<String, Match> {
        matches.into_iter().map(|m| (m.id.clone(), m)).collect()
    }

    #[test]
    fn empty_history_is_zero() {
        let report = aggregate(&[], &HashMap::new());
        assert!(report.leagues.is_empty());
        assert_eq!(report.overall_accuracy, 0.0);
        assert_eq!(report.total_votes, 0);
    }

    #[test]
    fn undecided_league_reports_zero_not_nan() {
        let fixtures = index(vec![unfinished("1", "L2")]);
        let report = aggregate(&[vote("1", VoteChoice::Home)], &fixtures);
        assert_eq!(report.leagues.len(), 1);
        assert_eq!(report.leagues[0].total, 0);
        assert_eq!(report.leagues[0].accuracy, 0.0);
        assert!(!report.overall_accuracy.is_nan());
        assert_eq!(report.history[0].correct, None);
    }

    #[test]
    fn ordering_is_descending_with_stable_ties() {
        let fixtures = index(vec![
            finished("1", "A", 1, 0),
            finished("2", "B", 1, 0),
            finished("3", "C", 0, 1),
            finished("4", "D", 2, 2),
        ]);
        let votes = [
            vote("1", VoteChoice::Away),
            vote("2", VoteChoice::Home),
            vote("3", VoteChoice::Home),
            vote("4", VoteChoice::Draw),
        ];
        let report = aggregate(&votes, &fixtures);
        let order: Vec<&str> = report
            .leagues
            .iter()
            .map(|l| l.competition_id.as_str())
            .collect();
        assert_eq!(order, vec!["B", "D", "A", "C"]);
        for pair in report.leagues.windows(2) {
            assert!(pair[0].accuracy >= pair[1].accuracy);
        }
    }

    #[test]
    fn missing_fixture_stays_pending() {
        let report = aggregate(&[vote("404", VoteChoice::Home)], &HashMap::new());
        assert!(report.leagues.is_empty());
        assert_eq!(report.total_votes, 1);
        assert_eq!(report.decided, 0);
        assert!(report.history[0].fixture.is_none());
    }
}
