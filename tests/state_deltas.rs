use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;

use wkb_terminal::accuracy::AccuracyReport;
use wkb_terminal::feed::{Feed, group_by_competition, order_live_first};
use wkb_terminal::models::{Match, UserProfile, VotePercentages};
use wkb_terminal::state::{AppState, Delta, Screen, SessionUser, apply_delta};
use wkb_terminal::vote_gate::VoteRejection;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 2).expect("valid date")
}

fn fixture_feed() -> Feed {
    let mut matches: Vec<Match> =
        serde_json::from_str(&read_fixture("matches.json")).expect("fixture should parse");
    order_live_first(&mut matches);
    Feed {
        date: Some(day()),
        groups: group_by_competition(matches),
        vote_errors: Vec::new(),
    }
}

fn logged_in_state() -> AppState {
    let mut state = AppState::new(day());
    state.user = Some(SessionUser {
        user_id: "u1".to_string(),
        username: Some("ana".to_string()),
        is_admin: false,
    });
    let seq = state.next_feed_seq();
    apply_delta(
        &mut state,
        Delta::SetFeed {
            seq,
            feed: fixture_feed(),
        },
    );
    state
}

fn select_match(state: &mut AppState, id: &str) {
    state.selected = state
        .feed
        .iter_matches()
        .position(|m| m.id == id)
        .expect("match should be in the feed");
}

#[test]
fn stale_feed_response_is_dropped() {
    let mut state = AppState::new(day());
    let first = state.next_feed_seq();
    let second = state.next_feed_seq();

    apply_delta(
        &mut state,
        Delta::SetFeed {
            seq: first,
            feed: fixture_feed(),
        },
    );
    assert_eq!(state.feed.match_count(), 0);
    assert!(state.feed_loading);

    apply_delta(
        &mut state,
        Delta::SetFeed {
            seq: second,
            feed: fixture_feed(),
        },
    );
    assert_eq!(state.feed.match_count(), 5);
    assert!(!state.feed_loading);
}

#[test]
fn feed_shows_live_matches_first() {
    let state = logged_in_state();
    let ids: Vec<&str> = state.feed.iter_matches().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["504", "502", "503", "501", "505"]);
    assert_eq!(state.feed.groups[0].name, "Primera Division");
    assert!(state.feed.has_live());
}

#[test]
fn recorded_vote_updates_split_and_blocks_revote() {
    let mut state = logged_in_state();
    select_match(&mut state, "502");

    let id = state.begin_vote().expect("vote should be admitted");
    assert_eq!(id, "502");
    assert!(state.vote_gate.is_pending("502"));
    assert_eq!(state.begin_vote(), Err(VoteRejection::AlreadyVoted));

    let epoch = state.session_epoch;
    apply_delta(
        &mut state,
        Delta::VoteRecorded {
            epoch,
            match_id: id,
            percentages: VotePercentages {
                home: 10.0,
                draw: 30.0,
                away: 60.0,
            },
        },
    );
    assert!(state.vote_gate.has_voted("502"));
    assert!(state.stats_stale);
    let split = state
        .selected_match()
        .and_then(|m| m.vote_percentages)
        .expect("split should be stored");
    assert_eq!(split.away, 60.0);
    assert_eq!(state.begin_vote(), Err(VoteRejection::AlreadyVoted));
}

#[test]
fn failed_vote_can_be_retried() {
    let mut state = logged_in_state();
    select_match(&mut state, "502");
    let id = state.begin_vote().expect("vote should be admitted");
    let epoch = state.session_epoch;
    apply_delta(
        &mut state,
        Delta::VoteFailed {
            epoch,
            match_id: id,
            message: "Failed to submit vote".to_string(),
        },
    );
    assert_eq!(state.flash.as_deref(), Some("Failed to submit vote"));
    assert!(state.begin_vote().is_ok());
}

#[test]
fn votes_on_started_matches_or_anonymous_are_rejected() {
    let mut state = logged_in_state();
    select_match(&mut state, "501");
    assert!(matches!(
        state.begin_vote(),
        Err(VoteRejection::VotingClosed(_))
    ));

    state.user = None;
    select_match(&mut state, "502");
    assert_eq!(state.begin_vote(), Err(VoteRejection::NotLoggedIn));
}

#[test]
fn profile_marks_admin_and_logout_clears_everything() {
    let mut state = logged_in_state();
    let profile: UserProfile =
        serde_json::from_str(&read_fixture("profile.json")).expect("fixture should parse");
    let epoch = state.session_epoch;
    apply_delta(
        &mut state,
        Delta::SetProfile {
            epoch,
            profile,
            report: AccuracyReport::default(),
        },
    );
    assert!(state.is_admin());

    state.screen = Screen::Admin;
    select_match(&mut state, "502");
    state.begin_vote().expect("vote should be admitted");
    apply_delta(&mut state, Delta::SessionEnded);

    assert!(!state.is_logged_in());
    assert!(!state.vote_gate.is_pending("502"));
    assert!(state.profile.is_none());
    assert_eq!(state.screen, Screen::Matches);
}

#[test]
fn reset_clears_votes_and_requests_refresh() {
    let mut state = logged_in_state();
    select_match(&mut state, "502");
    let id = state.begin_vote().expect("vote should be admitted");
    let epoch = state.session_epoch;
    apply_delta(
        &mut state,
        Delta::VoteRecorded {
            epoch,
            match_id: id,
            percentages: VotePercentages::default(),
        },
    );
    state.feed_stale = false;

    apply_delta(&mut state, Delta::ResetCompleted);
    assert!(!state.vote_gate.has_voted("502"));
    assert!(state.feed_stale);
    assert!(state.admin_stale);
    assert_eq!(
        state.flash.as_deref(),
        Some("All predictions and votes have been reset successfully.")
    );
}

#[test]
fn login_schedules_profile_load() {
    let mut state = AppState::new(day());
    apply_delta(
        &mut state,
        Delta::SessionStarted {
            user_id: "u7".to_string(),
            username: Some("boss".to_string()),
        },
    );
    assert!(state.is_logged_in());
    assert!(!state.is_admin());
    assert!(state.profile_stale);

    let epoch = state.begin_profile_load();
    assert!(!state.profile_stale);
    assert!(state.profile_loading);

    let mut profile: UserProfile =
        serde_json::from_str(&read_fixture("profile.json")).expect("fixture should parse");
    profile.username = "boss".to_string();
    apply_delta(
        &mut state,
        Delta::SetProfile {
            epoch,
            profile,
            report: AccuracyReport::default(),
        },
    );
    assert!(state.is_admin());
    assert!(!state.profile_loading);
}

#[test]
fn vote_reply_from_previous_session_is_dropped() {
    let mut state = logged_in_state();
    select_match(&mut state, "502");
    let id = state.begin_vote().expect("vote should be admitted");
    let old_epoch = state.session_epoch;

    apply_delta(&mut state, Delta::SessionEnded);
    apply_delta(
        &mut state,
        Delta::VoteRecorded {
            epoch: old_epoch,
            match_id: id,
            percentages: VotePercentages::default(),
        },
    );
    apply_delta(
        &mut state,
        Delta::SessionStarted {
            user_id: "u2".to_string(),
            username: Some("bea".to_string()),
        },
    );

    assert!(!state.vote_gate.has_voted("502"));
    assert_eq!(state.begin_vote(), Ok("502".to_string()));
}

#[test]
fn profile_reply_from_previous_session_is_dropped() {
    let mut state = logged_in_state();
    let old_epoch = state.begin_profile_load();
    apply_delta(&mut state, Delta::SessionEnded);

    let profile: UserProfile =
        serde_json::from_str(&read_fixture("profile.json")).expect("fixture should parse");
    apply_delta(
        &mut state,
        Delta::SetProfile {
            epoch: old_epoch,
            profile,
            report: AccuracyReport::default(),
        },
    );
    assert!(state.profile.is_none());
    assert!(state.report.is_none());

    apply_delta(
        &mut state,
        Delta::SessionStarted {
            user_id: "u2".to_string(),
            username: Some("bea".to_string()),
        },
    );
    apply_delta(
        &mut state,
        Delta::ProfileFailed {
            epoch: old_epoch,
            message: "Failed to fetch user profile".to_string(),
        },
    );
    assert!(state.profile_error.is_none());
}

#[test]
fn stale_admin_failure_is_ignored() {
    let mut state = logged_in_state();
    let old = state.next_admin_seq();
    let _current = state.next_admin_seq();
    apply_delta(
        &mut state,
        Delta::AdminFailed {
            seq: Some(old),
            message: "Failed to fetch admin matches".to_string(),
        },
    );
    assert!(state.admin_loading);
    assert!(state.flash.is_none());
}

#[test]
fn log_buffer_is_bounded() {
    let mut state = AppState::new(day());
    for i in 0..250 {
        state.push_log(format!("[INFO] line {i}"));
    }
    assert_eq!(state.logs.len(), 200);
    assert_eq!(state.logs.front().map(String::as_str), Some("[INFO] line 50"));
}
