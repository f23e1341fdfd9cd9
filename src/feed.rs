use chrono::NaiveDate;

use crate::api::{ApiResult, FixtureSource};
use crate::models::{Match, MatchStatus};

/// Live statuses in display priority order.
pub const LIVE_STATUS_ORDER: [MatchStatus; 4] = [
    MatchStatus::InPlay,
    MatchStatus::Halftime,
    MatchStatus::Paused,
    MatchStatus::Live,
];

#[derive(Debug, Clone, PartialEq)]
pub struct CompetitionGroup {
    pub competition_id: String,
    pub name: String,
    pub emblem: Option<String>,
    pub matches: Vec<Match>,
}

#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub date: Option<NaiveDate>,
    pub groups: Vec<CompetitionGroup>,
    /// Matches whose vote split could not be fetched, with the reason.
    pub vote_errors: Vec<(String, String)>,
}

impl Feed {
    pub fn match_count(&self) -> usize {
        self.groups.iter().map(|g| g.matches.len()).sum()
    }

    pub fn has_live(&self) -> bool {
        self.iter_matches().any(|m| m.status.is_live())
    }

    pub fn iter_matches(&self) -> impl Iterator<Item = &Match> {
        self.groups.iter().flat_map(|g| g.matches.iter())
    }

    pub fn match_at(&self, idx: usize) -> Option<&Match> {
        self.iter_matches().nth(idx)
    }

    pub fn find_mut(&mut self, match_id: &str) -> Option<&mut Match> {
        self.groups
            .iter_mut()
            .flat_map(|g| g.matches.iter_mut())
            .find(|m| m.id == match_id)
    }
}

fn live_rank(status: MatchStatus) -> usize {
    LIVE_STATUS_ORDER
        .iter()
        .position(|s| *s == status)
        .unwrap_or(LIVE_STATUS_ORDER.len())
}

/// Live matches first (by status priority), everything else keeps its order.
pub fn order_live_first(matches: &mut [Match]) {
    matches.sort_by_key(|m| live_rank(m.status));
}

/// Groups by competition id, listing competitions in order of first appearance.
pub fn group_by_competition(matches: Vec<Match>) -> Vec<CompetitionGroup> {
    let mut groups: Vec<CompetitionGroup> = Vec::new();
    for m in matches {
        if let Some(group) = groups
            .iter_mut()
            .find(|g| g.competition_id == m.competition.id)
        {
            group.matches.push(m);
            continue;
        }
        groups.push(CompetitionGroup {
            competition_id: m.competition.id.clone(),
            name: m.competition.name.clone(),
            emblem: m.competition.emblem.clone(),
            matches: vec![m],
        });
    }
    groups
}

/// Fetches a day's fixtures and their vote split.
///
/// A failed vote lookup leaves that match without a snapshot and is reported in
/// `vote_errors`; only a failed fixture fetch fails the whole feed.
pub fn build_feed(source: &impl FixtureSource, date: NaiveDate) -> ApiResult<Feed> {
    let mut matches = source.fetch_matches(date)?;
    let ids: Vec<String> = matches.iter().map(|m| m.id.clone()).collect();
    let mut votes = source.get_many_match_votes(&ids);

    for m in &mut matches {
        if let Some(percentages) = votes.found.remove(&m.id) {
            m.vote_percentages = Some(percentages);
        }
    }

    order_live_first(&mut matches);
    Ok(Feed {
        date: Some(date),
        groups: group_by_competition(matches),
        vote_errors: votes.errors,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::api::{ApiError, BatchLookup};
    use crate::models::{Competition, Team, VotePercentages};

    fn fixture(id: &str, league: &str, status: MatchStatus) -> Match {
        Match {
            id: id.to_string(),
            competition: Competition {
                id: league.to_string(),
                name: format!("League {league}"),
                emblem: None,
            },
            home_team: Team {
                name: format!("H{id}"),
                crest: None,
            },
            away_team: Team {
                name: format!("A{id}"),
                crest: None,
            },
            utc_date: "2026-10-19T18:00:00Z".to_string(),
            status,
            score: None,
            fans_prediction: None,
            admin_prediction: None,
            vote_percentages: None,
        }
    }

    struct StubSource {
        matches: Vec<Match>,
        fail_votes_for: &'static str,
        vote_calls: Cell<usize>,
    }

    impl FixtureSource for StubSource {
        fn fetch_matches(&self, _date: NaiveDate) -> ApiResult<Vec<Match>> {
            Ok(self.matches.clone())
        }

        fn get_many_match_votes(&self, ids: &[String]) -> BatchLookup<VotePercentages> {
            self.vote_calls.set(self.vote_calls.get() + 1);
            let mut batch = BatchLookup::default();
            for id in ids {
                if id == self.fail_votes_for {
                    batch.errors.push((id.clone(), "boom".to_string()));
                } else {
                    batch.found.insert(
                        id.clone(),
                        VotePercentages {
                            home: 50.0,
                            draw: 25.0,
                            away: 25.0,
                        },
                    );
                }
            }
            batch
        }
    }

    #[test]
    fn live_matches_come_first_in_stable_order() {
        let mut matches = vec![
            fixture("1", "L", MatchStatus::Scheduled),
            fixture("2", "L", MatchStatus::InPlay),
            fixture("3", "L", MatchStatus::Finished),
            fixture("4", "L", MatchStatus::Halftime),
        ];
        order_live_first(&mut matches);
        let statuses: Vec<MatchStatus> = matches.iter().map(|m| m.status).collect();
        assert_eq!(
            statuses,
            vec![
                MatchStatus::InPlay,
                MatchStatus::Halftime,
                MatchStatus::Scheduled,
                MatchStatus::Finished
            ]
        );
    }

    #[test]
    fn non_live_relative_order_is_kept() {
        let mut matches = vec![
            fixture("1", "L", MatchStatus::Finished),
            fixture("2", "L", MatchStatus::Timed),
            fixture("3", "L", MatchStatus::Live),
            fixture("4", "L", MatchStatus::Scheduled),
        ];
        order_live_first(&mut matches);
        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2", "4"]);
    }

    #[test]
    fn groups_follow_first_appearance() {
        let groups = group_by_competition(vec![
            fixture("1", "PL", MatchStatus::Scheduled),
            fixture("2", "CL", MatchStatus::Scheduled),
            fixture("3", "PL", MatchStatus::Scheduled),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].competition_id, "PL");
        assert_eq!(groups[0].matches.len(), 2);
        assert_eq!(groups[1].competition_id, "CL");
    }

    #[test]
    fn one_failed_vote_lookup_degrades_gracefully() {
        let source = StubSource {
            matches: vec![
                fixture("1", "PL", MatchStatus::Scheduled),
                fixture("2", "PL", MatchStatus::Scheduled),
            ],
            fail_votes_for: "2",
            vote_calls: Cell::new(0),
        };
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let feed = build_feed(&source, date).unwrap();
        assert_eq!(source.vote_calls.get(), 1);
        assert_eq!(feed.match_count(), 2);
        assert!(feed.match_at(0).unwrap().vote_percentages.is_some());
        assert!(feed.match_at(1).unwrap().vote_percentages.is_none());
        assert_eq!(feed.vote_errors.len(), 1);
    }

    #[test]
    fn failed_fixture_fetch_fails_feed() {
        struct Down;
        impl FixtureSource for Down {
            fn fetch_matches(&self, _date: NaiveDate) -> ApiResult<Vec<Match>> {
                Err(ApiError::Status {
                    status: 503,
                    message: "down".to_string(),
                })
            }
            fn get_many_match_votes(&self, _ids: &[String]) -> BatchLookup<VotePercentages> {
                BatchLookup::default()
            }
        }
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert!(build_feed(&Down, date).is_err());
    }
}
