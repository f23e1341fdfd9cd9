use crate::models::{DRAW_LABEL, Match, Prediction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickSide {
    Home,
    Draw,
    Away,
}

impl PickSide {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "home" | "h" | "1" => Some(PickSide::Home),
            "draw" | "d" | "x" => Some(PickSide::Draw),
            "away" | "a" | "2" => Some(PickSide::Away),
            _ => None,
        }
    }
}

/// The official prediction payload for one side of `m`.
pub fn prediction_for(m: &Match, side: PickSide) -> Prediction {
    match side {
        PickSide::Home => Prediction {
            team: m.home_team.name.clone(),
            logo: m.home_team.crest.clone(),
        },
        PickSide::Draw => Prediction {
            team: DRAW_LABEL.to_string(),
            logo: None,
        },
        PickSide::Away => Prediction {
            team: m.away_team.name.clone(),
            logo: m.away_team.crest.clone(),
        },
    }
}

/// Two-step guard in front of the system-wide reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResetConfirmation {
    #[default]
    Idle,
    Armed,
}

impl ResetConfirmation {
    pub fn request(&mut self) {
        *self = ResetConfirmation::Armed;
    }

    pub fn cancel(&mut self) {
        *self = ResetConfirmation::Idle;
    }

    /// True exactly once per `request`; the guard disarms either way.
    pub fn confirm(&mut self) -> bool {
        let armed = *self == ResetConfirmation::Armed;
        *self = ResetConfirmation::Idle;
        armed
    }

    pub fn is_armed(self) -> bool {
        self == ResetConfirmation::Armed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Competition, MatchStatus, Team};

    fn sample() -> Match {
        Match {
            id: "1".to_string(),
            competition: Competition {
                id: "PL".to_string(),
                name: "Premier League".to_string(),
                emblem: None,
            },
            home_team: Team {
                name: "Arsenal".to_string(),
                crest: Some("https://crests/ars.png".to_string()),
            },
            away_team: Team {
                name: "Chelsea".to_string(),
                crest: Some("https://crests/che.png".to_string()),
            },
            utc_date: String::new(),
            status: MatchStatus::Scheduled,
            score: None,
            fans_prediction: None,
            admin_prediction: None,
            vote_percentages: None,
        }
    }

    #[test]
    fn draw_pick_has_no_logo() {
        let m = sample();
        let draw = prediction_for(&m, PickSide::Draw);
        assert_eq!(draw.team, "Draw");
        assert!(draw.logo.is_none());
        let away = prediction_for(&m, PickSide::Away);
        assert_eq!(away.team, "Chelsea");
        assert_eq!(away.logo.as_deref(), Some("https://crests/che.png"));
    }

    #[test]
    fn reset_needs_request_before_confirm() {
        let mut guard = ResetConfirmation::default();
        assert!(!guard.confirm());
        guard.request();
        assert!(guard.is_armed());
        guard.cancel();
        assert!(!guard.confirm());
        guard.request();
        assert!(guard.confirm());
        assert!(!guard.confirm());
    }
}
