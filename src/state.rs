use std::collections::VecDeque;

use chrono::{Duration as ChronoDuration, NaiveDate};

use crate::accuracy::AccuracyReport;
use crate::admin::ResetConfirmation;
use crate::feed::Feed;
use crate::models::{Match, Prediction, PredictionStats, UserProfile, VoteChoice, VotePercentages};
use crate::vote_gate::{VoteGate, VoteRejection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Matches,
    Profile,
    Admin,
    Login,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Username,
    Password,
    Email,
    Country,
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub mode: AuthMode,
    pub focus: FormField,
    pub username: String,
    pub password: String,
    pub email: String,
    pub country: String,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub submitting: bool,
}

impl LoginForm {
    pub fn new() -> Self {
        Self {
            mode: AuthMode::Login,
            focus: FormField::Username,
            username: String::new(),
            password: String::new(),
            email: String::new(),
            country: String::new(),
            error: None,
            notice: None,
            submitting: false,
        }
    }

    pub fn fields(&self) -> &'static [FormField] {
        match self.mode {
            AuthMode::Login => &[FormField::Username, FormField::Password],
            AuthMode::Register => &[
                FormField::Username,
                FormField::Password,
                FormField::Email,
                FormField::Country,
            ],
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        };
        self.focus = FormField::Username;
        self.error = None;
        self.notice = None;
    }

    pub fn focus_next(&mut self) {
        let fields = self.fields();
        let idx = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(idx + 1) % fields.len()];
    }

    pub fn focus_prev(&mut self) {
        let fields = self.fields();
        let idx = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(idx + fields.len() - 1) % fields.len()];
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            FormField::Username => &mut self.username,
            FormField::Password => &mut self.password,
            FormField::Email => &mut self.email,
            FormField::Country => &mut self.country,
        }
    }

    pub fn input(&mut self, ch: char) {
        self.focused_mut().push(ch);
    }

    pub fn backspace(&mut self) {
        self.focused_mut().pop();
    }

    /// Local checks before anything is sent.
    pub fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err("Please enter username and password".to_string());
        }
        if self.mode == AuthMode::Register && self.country.trim().is_empty() {
            return Err("Please select a country".to_string());
        }
        Ok(())
    }

    pub fn reset_secrets(&mut self) {
        self.password.clear();
        self.submitting = false;
    }
}

impl Default for LoginForm {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: String,
    pub username: Option<String>,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub today: NaiveDate,
    pub date: NaiveDate,
    pub feed: Feed,
    pub feed_loading: bool,
    pub feed_seq: u64,
    pub feed_stale: bool,
    pub selected: usize,
    pub user: Option<SessionUser>,
    /// Bumped on every login and logout; replies tagged with an older epoch are dropped.
    pub session_epoch: u64,
    pub vote_gate: VoteGate,
    pub profile: Option<UserProfile>,
    pub report: Option<AccuracyReport>,
    pub profile_loading: bool,
    pub profile_error: Option<String>,
    pub profile_stale: bool,
    pub profile_scroll: u16,
    pub stats: Option<PredictionStats>,
    pub stats_error: Option<String>,
    pub stats_stale: bool,
    pub admin_date: NaiveDate,
    pub admin_matches: Vec<Match>,
    pub admin_loading: bool,
    pub admin_seq: u64,
    pub admin_stale: bool,
    pub admin_selected: usize,
    pub reset: ResetConfirmation,
    pub login: LoginForm,
    pub flash: Option<String>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl AppState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            screen: Screen::Matches,
            today,
            date: today,
            feed: Feed::default(),
            feed_loading: false,
            feed_seq: 0,
            feed_stale: true,
            selected: 0,
            user: None,
            session_epoch: 0,
            vote_gate: VoteGate::new(),
            profile: None,
            report: None,
            profile_loading: false,
            profile_error: None,
            profile_stale: false,
            profile_scroll: 0,
            stats: None,
            stats_error: None,
            stats_stale: true,
            admin_date: today,
            admin_matches: Vec::new(),
            admin_loading: false,
            admin_seq: 0,
            admin_stale: true,
            admin_selected: 0,
            reset: ResetConfirmation::Idle,
            login: LoginForm::new(),
            flash: None,
            logs: VecDeque::with_capacity(200),
            help_overlay: false,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_admin)
    }

    /// Issues the ticket for a new feed request; older tickets become stale.
    pub fn next_feed_seq(&mut self) -> u64 {
        self.feed_seq += 1;
        self.feed_loading = true;
        self.feed_stale = false;
        self.feed_seq
    }

    /// Marks a profile load in flight and returns the session it belongs to.
    pub fn begin_profile_load(&mut self) -> u64 {
        self.profile_stale = false;
        self.profile_loading = true;
        self.session_epoch
    }

    pub fn next_admin_seq(&mut self) -> u64 {
        self.admin_seq += 1;
        self.admin_loading = true;
        self.admin_stale = false;
        self.admin_seq
    }

    pub fn shift_date(&mut self, days: i64) {
        self.date += ChronoDuration::days(days);
        self.selected = 0;
        self.feed_stale = true;
    }

    pub fn jump_to_today(&mut self) {
        self.date = self.today;
        self.selected = 0;
        self.feed_stale = true;
    }

    pub fn shift_admin_date(&mut self, days: i64) {
        self.admin_date += ChronoDuration::days(days);
        self.admin_selected = 0;
        self.admin_stale = true;
    }

    pub fn selected_match(&self) -> Option<&Match> {
        self.feed.match_at(self.selected)
    }

    pub fn selected_admin_match(&self) -> Option<&Match> {
        self.admin_matches.get(self.admin_selected)
    }

    pub fn select_next(&mut self) {
        match self.screen {
            Screen::Matches => {
                let total = self.feed.match_count();
                if total > 0 {
                    self.selected = (self.selected + 1).min(total - 1);
                }
            }
            Screen::Admin => {
                let total = self.admin_matches.len();
                if total > 0 {
                    self.admin_selected = (self.admin_selected + 1).min(total - 1);
                }
            }
            Screen::Profile => self.profile_scroll = self.profile_scroll.saturating_add(1),
            Screen::Login => self.login.focus_next(),
        }
    }

    pub fn select_prev(&mut self) {
        match self.screen {
            Screen::Matches => self.selected = self.selected.saturating_sub(1),
            Screen::Admin => self.admin_selected = self.admin_selected.saturating_sub(1),
            Screen::Profile => self.profile_scroll = self.profile_scroll.saturating_sub(1),
            Screen::Login => self.login.focus_prev(),
        }
    }

    /// Runs the local vote checks against the selected match and marks it in flight.
    pub fn begin_vote(&mut self) -> Result<String, VoteRejection> {
        let logged_in = self.is_logged_in();
        let Some(m) = self.feed.match_at(self.selected) else {
            return Err(VoteRejection::NoMatch);
        };
        let id = m.id.clone();
        self.vote_gate.admit(logged_in, m)?;
        Ok(id)
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    fn clamp_selection(&mut self) {
        let total = self.feed.match_count();
        if total == 0 {
            self.selected = 0;
        } else if self.selected >= total {
            self.selected = total - 1;
        }
        if self.admin_matches.is_empty() {
            self.admin_selected = 0;
        } else if self.admin_selected >= self.admin_matches.len() {
            self.admin_selected = self.admin_matches.len() - 1;
        }
    }
}

#[derive(Debug, Clone)]
pub enum Delta {
    SetFeed {
        seq: u64,
        feed: Feed,
    },
    FeedFailed {
        seq: u64,
        message: String,
    },
    VoteRecorded {
        epoch: u64,
        match_id: String,
        percentages: VotePercentages,
    },
    VoteFailed {
        epoch: u64,
        match_id: String,
        message: String,
    },
    SessionStarted {
        user_id: String,
        username: Option<String>,
    },
    SessionEnded,
    Registered {
        username: String,
    },
    AuthFailed(String),
    SetProfile {
        epoch: u64,
        profile: UserProfile,
        report: AccuracyReport,
    },
    ProfileFailed {
        epoch: u64,
        message: String,
    },
    SetStats(PredictionStats),
    StatsFailed(String),
    SetAdminMatches {
        seq: u64,
        matches: Vec<Match>,
    },
    AdminFailed {
        seq: Option<u64>,
        message: String,
    },
    AdminPredictionSaved {
        match_id: String,
        prediction: Prediction,
    },
    ResetCompleted,
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    FetchFeed {
        date: NaiveDate,
        seq: u64,
    },
    CastVote {
        epoch: u64,
        match_id: String,
        choice: VoteChoice,
    },
    Login {
        username: String,
        password: String,
    },
    Register {
        username: String,
        password: String,
        email: Option<String>,
        country: String,
    },
    Logout,
    FetchProfile {
        epoch: u64,
    },
    FetchStats,
    FetchAdminMatches {
        date: NaiveDate,
        seq: u64,
    },
    AdminPredict {
        match_id: String,
        prediction: Prediction,
    },
    ResetPredictions,
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::SetFeed { seq, feed } => {
            if seq != state.feed_seq {
                state.push_log(format!("[INFO] Dropped stale feed response #{seq}"));
                return;
            }
            for (id, err) in &feed.vote_errors {
                state.push_log(format!("[WARN] Vote split unavailable for {id}: {err}"));
            }
            state.feed = feed;
            state.feed_loading = false;
            state.clamp_selection();
        }
        Delta::FeedFailed { seq, message } => {
            if seq != state.feed_seq {
                return;
            }
            state.feed_loading = false;
            state.push_log(format!("[WARN] Error fetching matches: {message}"));
        }
        Delta::VoteRecorded {
            epoch,
            match_id,
            percentages,
        } => {
            if epoch != state.session_epoch {
                state.push_log(format!("[INFO] Dropped vote reply for {match_id} from an old session"));
                return;
            }
            state.vote_gate.confirm(&match_id);
            if let Some(m) = state.feed.find_mut(&match_id) {
                m.vote_percentages = Some(percentages);
            }
            state.flash = None;
            state.stats_stale = true;
            state.push_log(format!("[INFO] Vote recorded for match {match_id}"));
        }
        Delta::VoteFailed {
            epoch,
            match_id,
            message,
        } => {
            if epoch != state.session_epoch {
                return;
            }
            state.vote_gate.abandon(&match_id);
            state.push_log(format!("[WARN] Error submitting vote: {message}"));
            state.flash = Some(message);
        }
        Delta::SessionStarted { user_id, username } => {
            state.session_epoch += 1;
            state.vote_gate.clear();
            state.profile = None;
            state.report = None;
            state.profile_error = None;
            state.profile_stale = true;
            state.user = Some(SessionUser {
                user_id,
                username: username.clone(),
                is_admin: false,
            });
            state.login.reset_secrets();
            state.login.error = None;
            if state.screen == Screen::Login {
                state.screen = Screen::Matches;
            }
            state.push_log(format!(
                "[INFO] Logged in as {}",
                username.as_deref().unwrap_or("user")
            ));
        }
        Delta::SessionEnded => {
            state.session_epoch += 1;
            state.user = None;
            state.profile_stale = false;
            state.profile_loading = false;
            state.vote_gate.clear();
            state.profile = None;
            state.report = None;
            state.admin_matches.clear();
            state.reset.cancel();
            if matches!(state.screen, Screen::Profile | Screen::Admin) {
                state.screen = Screen::Matches;
            }
            state.push_log("[INFO] Logged out");
        }
        Delta::Registered { username } => {
            state.login.reset_secrets();
            state.login.mode = AuthMode::Login;
            state.login.focus = FormField::Password;
            state.login.username = username;
            state.login.error = None;
            state.login.notice = Some("Registration successful! You can now log in.".to_string());
        }
        Delta::AuthFailed(message) => {
            state.login.submitting = false;
            state.login.error = Some(message.clone());
            state.push_log(format!("[WARN] Authentication failed: {message}"));
        }
        Delta::SetProfile {
            epoch,
            profile,
            report,
        } => {
            if epoch != state.session_epoch {
                return;
            }
            if let Some(user) = state.user.as_mut() {
                user.is_admin = profile.is_admin;
                if user.username.is_none() {
                    user.username = Some(profile.username.clone());
                }
            }
            state.profile = Some(profile);
            state.report = Some(report);
            state.profile_loading = false;
            state.profile_error = None;
        }
        Delta::ProfileFailed { epoch, message } => {
            if epoch != state.session_epoch {
                return;
            }
            state.profile_loading = false;
            state.profile_error = Some("Failed to load profile".to_string());
            state.push_log(format!("[WARN] Error fetching user profile: {message}"));
        }
        Delta::SetStats(stats) => {
            state.stats = Some(stats);
            state.stats_error = None;
        }
        Delta::StatsFailed(message) => {
            state.stats_error = Some("Failed to load prediction statistics".to_string());
            state.push_log(format!("[WARN] Error fetching stats: {message}"));
        }
        Delta::SetAdminMatches { seq, matches } => {
            if seq != state.admin_seq {
                return;
            }
            state.admin_matches = matches;
            state.admin_loading = false;
            state.clamp_selection();
        }
        Delta::AdminFailed { seq, message } => {
            if seq.is_some_and(|s| s != state.admin_seq) {
                return;
            }
            if seq.is_some() {
                state.admin_loading = false;
            }
            state.push_log(format!("[WARN] Admin request failed: {message}"));
            state.flash = Some(message);
        }
        Delta::AdminPredictionSaved {
            match_id,
            prediction,
        } => {
            if let Some(m) = state.feed.find_mut(&match_id) {
                m.admin_prediction = Some(prediction.clone());
            }
            state.push_log(format!(
                "[INFO] Official prediction for {match_id}: {}",
                prediction.team
            ));
            state.admin_stale = true;
        }
        Delta::ResetCompleted => {
            state.vote_gate.clear();
            state.admin_stale = true;
            state.feed_stale = true;
            state.stats_stale = true;
            state.flash = Some("All predictions and votes have been reset successfully.".to_string());
            state.push_log("[INFO] Predictions reset");
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
