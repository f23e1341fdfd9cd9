use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Label the backend uses for a drawn result in prediction records.
pub const DRAW_LABEL: &str = "Draw";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Scheduled,
    Timed,
    InPlay,
    Halftime,
    Paused,
    Live,
    Finished,
    #[serde(other)]
    Other,
}

impl MatchStatus {
    pub fn is_live(self) -> bool {
        matches!(
            self,
            MatchStatus::InPlay | MatchStatus::Halftime | MatchStatus::Paused | MatchStatus::Live
        )
    }

    pub fn is_open_for_votes(self) -> bool {
        matches!(self, MatchStatus::Scheduled | MatchStatus::Timed)
    }

    pub fn label(self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "SCHEDULED",
            MatchStatus::Timed => "TIMED",
            MatchStatus::InPlay => "IN_PLAY",
            MatchStatus::Halftime => "HALFTIME",
            MatchStatus::Paused => "PAUSED",
            MatchStatus::Live => "LIVE",
            MatchStatus::Finished => "FINISHED",
            MatchStatus::Other => "OTHER",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteChoice {
    #[serde(alias = "home")]
    Home,
    #[serde(alias = "draw")]
    Draw,
    #[serde(alias = "away")]
    Away,
}

impl VoteChoice {
    pub const ALL: [VoteChoice; 3] = [VoteChoice::Home, VoteChoice::Draw, VoteChoice::Away];

    pub fn label(self) -> &'static str {
        match self {
            VoteChoice::Home => "HOME",
            VoteChoice::Draw => "DRAW",
            VoteChoice::Away => "AWAY",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HOME" | "H" | "1" => Some(VoteChoice::Home),
            "DRAW" | "D" | "X" => Some(VoteChoice::Draw),
            "AWAY" | "A" | "2" => Some(VoteChoice::Away),
            _ => None,
        }
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competition {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub emblem: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    #[serde(default)]
    pub crest: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreLine {
    #[serde(default)]
    pub home: Option<u32>,
    #[serde(default)]
    pub away: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    #[serde(default)]
    pub full_time: Option<ScoreLine>,
}

/// A stored prediction: a team name (or [`DRAW_LABEL`]) plus the badge to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub team: String,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VotePercentages {
    #[serde(rename = "HOME", alias = "home", default, deserialize_with = "lenient_f64")]
    pub home: f64,
    #[serde(rename = "DRAW", alias = "draw", default, deserialize_with = "lenient_f64")]
    pub draw: f64,
    #[serde(rename = "AWAY", alias = "away", default, deserialize_with = "lenient_f64")]
    pub away: f64,
}

impl VotePercentages {
    pub fn get(&self, choice: VoteChoice) -> f64 {
        match choice {
            VoteChoice::Home => self.home,
            VoteChoice::Draw => self.draw,
            VoteChoice::Away => self.away,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub competition: Competition,
    pub home_team: Team,
    pub away_team: Team,
    #[serde(default)]
    pub utc_date: String,
    pub status: MatchStatus,
    #[serde(default)]
    pub score: Option<Score>,
    #[serde(default)]
    pub fans_prediction: Option<Prediction>,
    #[serde(default)]
    pub admin_prediction: Option<Prediction>,
    #[serde(default)]
    pub vote_percentages: Option<VotePercentages>,
}

impl Match {
    /// Full-time score, only when both sides are populated.
    pub fn final_score(&self) -> Option<(u32, u32)> {
        let line = self.score.as_ref()?.full_time?;
        Some((line.home?, line.away?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    #[serde(deserialize_with = "string_or_number")]
    pub match_id: String,
    pub vote: VoteChoice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, alias = "_id", deserialize_with = "string_or_number")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub votes: Vec<Vote>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAccuracy {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub user_accuracy: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub admin_accuracy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionStats {
    #[serde(default)]
    pub today: DailyAccuracy,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub user_trend: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub admin_trend: f64,
}

/// Accepts ids sent either as JSON numbers or strings.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Percentages come back as numbers or as pre-formatted strings like "33.33".
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => Ok(s.trim().trim_end_matches('%').parse::<f64>().unwrap_or(0.0)),
        _ => Ok(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_known_and_unknown_values() {
        let live: MatchStatus = serde_json::from_str("\"IN_PLAY\"").unwrap();
        assert_eq!(live, MatchStatus::InPlay);
        let half: MatchStatus = serde_json::from_str("\"HALFTIME\"").unwrap();
        assert!(half.is_live());
        let postponed: MatchStatus = serde_json::from_str("\"POSTPONED\"").unwrap();
        assert_eq!(postponed, MatchStatus::Other);
        assert!(!postponed.is_open_for_votes());
    }

    #[test]
    fn percentages_accept_strings_and_lowercase_keys() {
        let p: VotePercentages =
            serde_json::from_str(r#"{"home":"50.00","draw":25,"AWAY":"25%"}"#).unwrap();
        assert_eq!(p.home, 50.0);
        assert_eq!(p.draw, 25.0);
        assert_eq!(p.away, 25.0);
    }

    #[test]
    fn final_score_requires_both_sides() {
        let raw = r#"{
            "id": 7,
            "competition": {"id": 2021, "name": "Premier League"},
            "homeTeam": {"name": "A"},
            "awayTeam": {"name": "B"},
            "status": "IN_PLAY",
            "score": {"fullTime": {"home": 1, "away": null}}
        }"#;
        let m: Match = serde_json::from_str(raw).unwrap();
        assert_eq!(m.id, "7");
        assert_eq!(m.competition.id, "2021");
        assert_eq!(m.final_score(), None);
    }

    #[test]
    fn vote_choice_parse_is_forgiving() {
        assert_eq!(VoteChoice::parse("home"), Some(VoteChoice::Home));
        assert_eq!(VoteChoice::parse(" x "), Some(VoteChoice::Draw));
        assert_eq!(VoteChoice::parse("2"), Some(VoteChoice::Away));
        assert_eq!(VoteChoice::parse("maybe"), None);
    }
}
