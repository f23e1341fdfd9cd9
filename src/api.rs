use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rayon::prelude::*;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AppConfig;
use crate::http_client::http_client;
use crate::models::{
    Match, Prediction, PredictionStats, UserProfile, Vote, VoteChoice, VotePercentages,
    string_or_number,
};
use crate::session::Session;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{message} (http {status})")]
    Status { status: u16, message: String },

    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("not logged in")]
    NotAuthenticated,
}

impl ApiError {
    /// Message suitable for an inline error line.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            ApiError::NotAuthenticated => "Please log in first".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result of a fan-out lookup: what came back, plus per-id failures.
#[derive(Debug, Clone)]
pub struct BatchLookup<T> {
    pub found: HashMap<String, T>,
    pub errors: Vec<(String, String)>,
}

impl<T> Default for BatchLookup<T> {
    fn default() -> Self {
        Self {
            found: HashMap::new(),
            errors: Vec::new(),
        }
    }
}

/// Source of fixtures and their crowd split, used by the feed builder.
pub trait FixtureSource {
    fn fetch_matches(&self, date: NaiveDate) -> ApiResult<Vec<Match>>;
    fn get_many_match_votes(&self, ids: &[String]) -> BatchLookup<VotePercentages>;
}

/// Where votes are submitted.
pub trait VoteSink {
    fn submit_vote(&self, match_id: &str, choice: VoteChoice) -> ApiResult<VotePercentages>;
}

/// Profile plus the fixtures behind each historical vote.
pub trait VoteHistorySource {
    fn get_profile(&self) -> ApiResult<UserProfile>;
    fn get_many_match_details(&self, ids: &[String]) -> BatchLookup<Match>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Token,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    #[serde(deserialize_with = "string_or_number")]
    user_id: String,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleAuthResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    user_id: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    needs_username: bool,
    #[serde(default)]
    needs_country: bool,
}

#[derive(Debug, Deserialize)]
struct VoteResponse {
    percentages: VotePercentages,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoteRequest<'a> {
    match_id: &'a str,
    vote: VoteChoice,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    country: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminPredictRequest<'a> {
    match_id: &'a str,
    prediction: &'a Prediction,
}

/// Outcome of a Google sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleLogin {
    LoggedIn(Session),
    /// The account exists but username and/or country must be supplied.
    NeedsProfile {
        user_id: String,
        needs_username: bool,
        needs_country: bool,
    },
}

/// Blocking REST client for the voting backend.
pub struct ApiClient {
    base_url: String,
    client: &'static Client,
    session: Session,
    pool: Option<rayon::ThreadPool>,
}

impl ApiClient {
    pub fn new(config: &AppConfig, session: Session) -> anyhow::Result<Self> {
        let client = http_client(config.request_timeout)?;
        Ok(Self {
            base_url: config.api_url.clone(),
            client,
            session,
            pool: build_fetch_pool(config.fetch_parallelism),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn login(&mut self, username: &str, password: &str) -> ApiResult<&Session> {
        let body = serde_json::json!({ "username": username, "password": password });
        let resp: LoginResponse =
            self.post_json("/login", Access::Public, Some(&body), "Login failed")?;
        self.start_session(resp.token, resp.user_id, resp.username.or(Some(username.to_string())));
        Ok(&self.session)
    }

    pub fn logout(&mut self) {
        self.session.clear();
    }

    pub fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
        country: &str,
    ) -> ApiResult<Value> {
        let body = RegisterRequest {
            username,
            password,
            email: email.filter(|e| !e.trim().is_empty()),
            country,
        };
        self.post_json("/register", Access::Public, Some(&body), "Registration failed")
    }

    /// Google sign-in through the API route.
    pub fn google_auth(&mut self, id_token: &str) -> ApiResult<GoogleLogin> {
        let url = self.api_url("/auth/google");
        self.google_login_at(url, id_token)
    }

    /// Google sign-in through the credential exchange route at the server root.
    pub fn google_auth_token(&mut self, id_token: &str) -> ApiResult<GoogleLogin> {
        let url = format!("{}/auth/google/token", self.base_url);
        self.google_login_at(url, id_token)
    }

    fn google_login_at(&mut self, url: String, id_token: &str) -> ApiResult<GoogleLogin> {
        let body = serde_json::json!({ "token": id_token });
        let req = self.client.post(&url).json(&body);
        let resp: GoogleAuthResponse = self.send(req, &url, "Google authentication failed")?;
        let token = resp.token.filter(|t| !t.trim().is_empty());
        match token {
            Some(token) if !resp.needs_username && !resp.needs_country => {
                let name = resp.username.or(resp.email);
                self.start_session(token, resp.user_id, name);
                Ok(GoogleLogin::LoggedIn(self.session.clone()))
            }
            _ => Ok(GoogleLogin::NeedsProfile {
                user_id: resp.user_id,
                needs_username: resp.needs_username,
                needs_country: resp.needs_country,
            }),
        }
    }

    /// Second step of a Google sign-in that came back as `NeedsProfile`.
    pub fn complete_google_profile(
        &mut self,
        user_id: &str,
        username: &str,
        country: &str,
    ) -> ApiResult<&Session> {
        let body = serde_json::json!({ "userId": user_id, "username": username, "country": country });
        let resp: LoginResponse = self.post_json(
            "/update-user-info",
            Access::Public,
            Some(&body),
            "Failed to update user info",
        )?;
        self.start_session(resp.token, resp.user_id, Some(username.to_string()));
        Ok(&self.session)
    }

    pub fn update_google_user(&self, username: &str, country: &str) -> ApiResult<Value> {
        let body = serde_json::json!({ "username": username, "country": country });
        self.post_json(
            "/update-google-user",
            Access::Token,
            Some(&body),
            "Failed to update user info",
        )
    }

    pub fn fetch_matches(&self, date: NaiveDate) -> ApiResult<Vec<Match>> {
        let path = format!("/matches?date={}", format_date(date));
        self.get_json(&path, Access::Public, "Failed to fetch matches")
    }

    pub fn get_match_votes(&self, match_id: &str) -> ApiResult<VotePercentages> {
        let path = format!("/match-votes/{match_id}");
        self.get_json(&path, Access::Public, "Failed to fetch match votes")
    }

    pub fn get_many_match_votes(&self, ids: &[String]) -> BatchLookup<VotePercentages> {
        self.fan_out(ids, |id| self.get_match_votes(id))
    }

    pub fn submit_vote(&self, match_id: &str, choice: VoteChoice) -> ApiResult<VotePercentages> {
        let body = VoteRequest {
            match_id,
            vote: choice,
        };
        let resp: VoteResponse =
            self.post_json("/vote", Access::Token, Some(&body), "Failed to submit vote")?;
        Ok(resp.percentages)
    }

    pub fn get_profile(&self) -> ApiResult<UserProfile> {
        self.get_json("/profile", Access::Token, "Failed to fetch user profile")
    }

    pub fn get_user_votes(&self) -> ApiResult<Vec<Vote>> {
        self.get_json(
            "/user-votes",
            Access::Token,
            "Failed to fetch user votes and percentages",
        )
    }

    pub fn get_match_details(&self, match_id: &str) -> ApiResult<Match> {
        let path = format!("/match/{match_id}");
        self.get_json(&path, Access::Token, "Failed to fetch match details")
    }

    pub fn get_many_match_details(&self, ids: &[String]) -> BatchLookup<Match> {
        self.fan_out(ids, |id| self.get_match_details(id))
    }

    pub fn fetch_admin_matches(&self, date: NaiveDate) -> ApiResult<Vec<Match>> {
        let path = format!("/admin/matches?date={}", format_date(date));
        self.get_json(&path, Access::Token, "Failed to fetch admin matches")
    }

    pub fn submit_admin_prediction(
        &self,
        match_id: &str,
        prediction: &Prediction,
    ) -> ApiResult<Value> {
        let body = AdminPredictRequest {
            match_id,
            prediction,
        };
        self.post_json(
            "/admin/predict",
            Access::Token,
            Some(&body),
            "Failed to submit admin prediction",
        )
    }

    /// Clears every vote and prediction on the server. Irreversible.
    pub fn reset_predictions(&self) -> ApiResult<Value> {
        self.post_json::<Value, Value>(
            "/admin/reset-predictions",
            Access::Token,
            None,
            "Failed to reset predictions",
        )
    }

    pub fn get_prediction_stats(&self) -> ApiResult<PredictionStats> {
        self.get_json(
            "/prediction-stats",
            Access::Public,
            "Failed to fetch prediction statistics",
        )
    }

    fn start_session(&mut self, token: String, user_id: String, username: Option<String>) {
        self.session = Session {
            token: Some(token),
            user_id: Some(user_id),
            username,
        };
    }

    fn fan_out<T, F>(&self, ids: &[String], fetch: F) -> BatchLookup<T>
    where
        T: Send,
        F: Fn(&str) -> ApiResult<T> + Sync,
    {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = ids.iter().filter(|id| seen.insert(id.as_str())).collect();

        let results: Vec<(String, ApiResult<T>)> = with_fetch_pool(&self.pool, || {
            unique
                .par_iter()
                .map(|id| ((*id).clone(), fetch(id.as_str())))
                .collect()
        });

        let mut batch = BatchLookup::default();
        for (id, result) in results {
            match result {
                Ok(value) => {
                    batch.found.insert(id, value);
                }
                Err(err) => batch.errors.push((id, err.to_string())),
            }
        }
        batch
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder, access: Access) -> ApiResult<RequestBuilder> {
        match access {
            Access::Public => Ok(req),
            Access::Token => {
                let token = self.session.token().ok_or(ApiError::NotAuthenticated)?;
                // The backend expects the raw token, without a "Bearer " prefix.
                Ok(req.header(AUTHORIZATION, token))
            }
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        access: Access,
        fallback: &str,
    ) -> ApiResult<T> {
        let url = self.api_url(path);
        let req = self.authorize(self.client.get(&url), access)?;
        self.send(req, &url, fallback)
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        access: Access,
        body: Option<&B>,
        fallback: &str,
    ) -> ApiResult<T> {
        let url = self.api_url(path);
        let mut req = self.client.post(&url);
        req = match body {
            Some(body) => req.json(body),
            None => req.header(reqwest::header::CONTENT_TYPE, "application/json"),
        };
        let req = self.authorize(req, access)?;
        self.send(req, &url, fallback)
    }

    fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        url: &str,
        fallback: &str,
    ) -> ApiResult<T> {
        let resp = req.send().map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = resp.status();
        let body = resp.text().map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body, fallback),
            });
        }
        parse_body(&body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

impl FixtureSource for ApiClient {
    fn fetch_matches(&self, date: NaiveDate) -> ApiResult<Vec<Match>> {
        ApiClient::fetch_matches(self, date)
    }

    fn get_many_match_votes(&self, ids: &[String]) -> BatchLookup<VotePercentages> {
        ApiClient::get_many_match_votes(self, ids)
    }
}

impl VoteSink for ApiClient {
    fn submit_vote(&self, match_id: &str, choice: VoteChoice) -> ApiResult<VotePercentages> {
        ApiClient::submit_vote(self, match_id, choice)
    }
}

impl VoteHistorySource for ApiClient {
    fn get_profile(&self) -> ApiResult<UserProfile> {
        ApiClient::get_profile(self)
    }

    fn get_many_match_details(&self, ids: &[String]) -> BatchLookup<Match> {
        ApiClient::get_many_match_details(self, ids)
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Empty bodies are treated as JSON `null`.
fn parse_body<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        serde_json::from_str("null")
    } else {
        serde_json::from_str(trimmed)
    }
}

/// Server `message` field when present, otherwise the per-call fallback.
pub fn error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<Value>(body.trim())
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(|m| m.as_str())
                .map(|m| m.trim().to_string())
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .ok()
}

fn with_fetch_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn offline_client(session: Session) -> ApiClient {
        let config = AppConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_secs(1),
            fetch_parallelism: 2,
            feed_refresh: Duration::from_secs(60),
            session_file: None,
        };
        ApiClient::new(&config, session).expect("client should build")
    }

    #[test]
    fn error_message_prefers_server_message() {
        assert_eq!(
            error_message(r#"{"message":"Username taken"}"#, "Registration failed"),
            "Username taken"
        );
        assert_eq!(error_message("<html>oops</html>", "Login failed"), "Login failed");
        assert_eq!(error_message(r#"{"message":"  "}"#, "Login failed"), "Login failed");
    }

    #[test]
    fn token_calls_fail_fast_without_session() {
        let client = offline_client(Session::anonymous());
        let err = client.get_profile().unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
        let err = client.submit_vote("1", VoteChoice::Home).unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
    }

    #[test]
    fn logout_clears_session() {
        let mut client = offline_client(Session::new("tok", "u1"));
        assert!(client.is_authenticated());
        client.logout();
        assert!(!client.is_authenticated());
        assert_eq!(client.session(), &Session::anonymous());
    }

    #[test]
    fn empty_body_parses_as_null() {
        let v: Value = parse_body("  ").unwrap();
        assert!(v.is_null());
    }
}
