use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;

use crate::accuracy::load_profile_report;
use crate::api::ApiClient;
use crate::feed::build_feed;
use crate::persist;
use crate::state::{Delta, ProviderCommand};

/// Runs every network call off the UI thread until the command channel closes.
pub fn spawn_provider(
    client: ApiClient,
    session_path: Option<PathBuf>,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut worker = Worker {
            client,
            session_path,
            tx,
        };
        while let Ok(cmd) = cmd_rx.recv() {
            worker.handle(cmd);
        }
    })
}

struct Worker {
    client: ApiClient,
    session_path: Option<PathBuf>,
    tx: Sender<Delta>,
}

impl Worker {
    fn send(&self, delta: Delta) {
        let _ = self.tx.send(delta);
    }

    fn log(&self, msg: String) {
        self.send(Delta::Log(msg));
    }

    fn handle(&mut self, cmd: ProviderCommand) {
        match cmd {
            ProviderCommand::FetchFeed { date, seq } => match build_feed(&self.client, date) {
                Ok(feed) => {
                    self.log(format!(
                        "[INFO] Loaded {} matches for {}",
                        feed.match_count(),
                        date.format("%d/%m/%Y")
                    ));
                    self.send(Delta::SetFeed { seq, feed });
                }
                Err(err) => self.send(Delta::FeedFailed {
                    seq,
                    message: err.to_string(),
                }),
            },
            ProviderCommand::CastVote {
                epoch,
                match_id,
                choice,
            } => match self.client.submit_vote(&match_id, choice) {
                Ok(percentages) => self.send(Delta::VoteRecorded {
                    epoch,
                    match_id,
                    percentages,
                }),
                Err(err) => self.send(Delta::VoteFailed {
                    epoch,
                    match_id,
                    message: err.user_message(),
                }),
            },
            ProviderCommand::Login { username, password } => {
                match self.client.login(&username, &password) {
                    Ok(session) => {
                        let delta = Delta::SessionStarted {
                            user_id: session.user_id.clone().unwrap_or_default(),
                            username: session.username.clone(),
                        };
                        self.persist_session();
                        self.send(delta);
                    }
                    Err(err) => self.send(Delta::AuthFailed(err.user_message())),
                }
            }
            ProviderCommand::Register {
                username,
                password,
                email,
                country,
            } => match self
                .client
                .register(&username, &password, email.as_deref(), &country)
            {
                Ok(_) => {
                    self.log(format!("[INFO] Registered {username}"));
                    self.send(Delta::Registered { username });
                }
                Err(err) => self.send(Delta::AuthFailed(err.user_message())),
            },
            ProviderCommand::Logout => {
                self.client.logout();
                self.persist_session();
                self.send(Delta::SessionEnded);
            }
            ProviderCommand::FetchProfile { epoch } => match load_profile_report(&self.client) {
                Ok((profile, report, errors)) => {
                    for (id, err) in errors {
                        self.log(format!("[WARN] Error fetching match details for {id}: {err}"));
                    }
                    self.send(Delta::SetProfile {
                        epoch,
                        profile,
                        report,
                    });
                }
                Err(err) => self.send(Delta::ProfileFailed {
                    epoch,
                    message: err.to_string(),
                }),
            },
            ProviderCommand::FetchStats => match self.client.get_prediction_stats() {
                Ok(stats) => self.send(Delta::SetStats(stats)),
                Err(err) => self.send(Delta::StatsFailed(err.to_string())),
            },
            ProviderCommand::FetchAdminMatches { date, seq } => {
                match self.client.fetch_admin_matches(date) {
                    Ok(matches) => self.send(Delta::SetAdminMatches { seq, matches }),
                    Err(err) => self.send(Delta::AdminFailed {
                        seq: Some(seq),
                        message: err.user_message(),
                    }),
                }
            }
            ProviderCommand::AdminPredict {
                match_id,
                prediction,
            } => match self.client.submit_admin_prediction(&match_id, &prediction) {
                Ok(_) => self.send(Delta::AdminPredictionSaved {
                    match_id,
                    prediction,
                }),
                Err(err) => self.send(Delta::AdminFailed {
                    seq: None,
                    message: err.user_message(),
                }),
            },
            ProviderCommand::ResetPredictions => match self.client.reset_predictions() {
                Ok(_) => self.send(Delta::ResetCompleted),
                Err(err) => self.send(Delta::AdminFailed {
                    seq: None,
                    message: format!(
                        "Failed to reset predictions. Please try again. ({})",
                        err.user_message()
                    ),
                }),
            },
        }
    }

    fn persist_session(&self) {
        let Some(path) = self.session_path.as_ref() else {
            return;
        };
        if let Err(err) = persist::save_session(path, self.client.session()) {
            self.log(format!("[WARN] Session file error: {err:#}"));
        }
    }
}
