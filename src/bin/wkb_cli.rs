use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{Local, NaiveDate};

use wkb_terminal::accuracy::load_profile_report;
use wkb_terminal::admin::{PickSide, prediction_for};
use wkb_terminal::api::{ApiClient, GoogleLogin};
use wkb_terminal::config::{AppConfig, load_dotenv};
use wkb_terminal::feed::build_feed;
use wkb_terminal::models::VoteChoice;
use wkb_terminal::outcome::{admin_prediction_correct, fans_prediction_correct};
use wkb_terminal::persist;
use wkb_terminal::vote_gate::VoteGate;

const USAGE: &str = "usage: wkb_cli <command> [args]

commands:
  login <username> <password>
  register <username> <password> <country> [--email=<email>]
  google-login <id-token> [--username=<name> --country=<country>] [--root-route]
  update-google-user <username> <country>
  logout
  matches [--date=YYYY-MM-DD]
  vote <match-id> <home|draw|away> [--date=YYYY-MM-DD]
  profile
  user-votes
  stats
  admin-matches [--date=YYYY-MM-DD]
  admin-predict <match-id> <home|draw|away> [--date=YYYY-MM-DD]
  admin-reset --yes";

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    load_dotenv();
    let config = AppConfig::from_env();
    let session_path = config
        .session_file
        .clone()
        .or_else(persist::default_session_path);
    let session = session_path
        .as_deref()
        .map(persist::load_session)
        .unwrap_or_default();
    let mut client = ApiClient::new(&config, session)?;

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let positional = args
        .iter()
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .collect::<Vec<_>>();
    let Some((&command, rest)) = positional.split_first() else {
        println!("{USAGE}");
        return Ok(());
    };
    let date = parse_date_arg(&args)?.unwrap_or_else(|| Local::now().date_naive());

    match command {
        "login" => {
            let [username, password] = expect_args(rest, "login <username> <password>")?;
            client.login(username, password)?;
            save(&session_path, &client)?;
            println!("Logged in as {username}");
        }
        "register" => {
            let [username, password, country] =
                expect_args(rest, "register <username> <password> <country>")?;
            let email = flag_value(&args, "--email");
            client.register(username, password, email.as_deref(), country)?;
            println!("Registration successful! You can now log in.");
        }
        "google-login" => {
            let [id_token] = expect_args(rest, "google-login <id-token>")?;
            let outcome = if has_flag(&args, "--root-route") {
                client.google_auth_token(id_token)?
            } else {
                client.google_auth(id_token)?
            };
            match outcome {
                GoogleLogin::LoggedIn(session) => {
                    save(&session_path, &client)?;
                    println!(
                        "Logged in as {}",
                        session.username.as_deref().unwrap_or("Google user")
                    );
                }
                GoogleLogin::NeedsProfile {
                    user_id,
                    needs_username,
                    needs_country,
                } => {
                    let username = flag_value(&args, "--username");
                    let country = flag_value(&args, "--country");
                    let (Some(username), Some(country)) = (username, country) else {
                        bail!(
                            "account needs more details; rerun with {}",
                            missing_profile_flags(needs_username, needs_country).join(" and ")
                        );
                    };
                    client.complete_google_profile(&user_id, &username, &country)?;
                    save(&session_path, &client)?;
                    println!("Logged in as {username}");
                }
            }
        }
        "update-google-user" => {
            let [username, country] =
                expect_args(rest, "update-google-user <username> <country>")?;
            client.update_google_user(username, country)?;
            println!("Profile updated");
        }
        "logout" => {
            client.logout();
            save(&session_path, &client)?;
            println!("Logged out");
        }
        "matches" => print_matches(&client, date)?,
        "vote" => {
            let [match_id, raw_choice] = expect_args(rest, "vote <match-id> <home|draw|away>")?;
            let choice = VoteChoice::parse(raw_choice)
                .ok_or_else(|| anyhow!("unknown vote '{raw_choice}', expected home, draw or away"))?;
            let mut m = client
                .fetch_matches(date)?
                .into_iter()
                .find(|m| m.id == *match_id)
                .ok_or_else(|| anyhow!("match {match_id} not found on {date}"))?;
            let mut gate = VoteGate::new();
            let split = gate.cast_vote(&client, client.is_authenticated(), &mut m, choice)?;
            println!(
                "Vote recorded: {} {:.2}% | Draw {:.2}% | {} {:.2}%",
                m.home_team.name, split.home, split.draw, m.away_team.name, split.away
            );
        }
        "profile" => print_profile(&client)?,
        "user-votes" => {
            for vote in client.get_user_votes()? {
                println!("{}\t{}", vote.match_id, vote.vote);
            }
        }
        "stats" => {
            let stats = client.get_prediction_stats()?;
            println!(
                "Fans today: {:.2}% (trend {:+.2}%)",
                stats.today.user_accuracy, stats.user_trend
            );
            println!(
                "Official today: {:.2}% (trend {:+.2}%)",
                stats.today.admin_accuracy, stats.admin_trend
            );
        }
        "admin-matches" => {
            let matches = client.fetch_admin_matches(date)?;
            if matches.is_empty() {
                println!("No matches found for this date.");
            }
            for m in matches {
                let current = m
                    .admin_prediction
                    .as_ref()
                    .map(|p| p.team.as_str())
                    .unwrap_or("-");
                println!(
                    "{}\t{}\t{} vs {}\tCurrent Prediction: {current}",
                    m.id, m.competition.name, m.home_team.name, m.away_team.name
                );
            }
        }
        "admin-predict" => {
            let [match_id, raw_side] =
                expect_args(rest, "admin-predict <match-id> <home|draw|away>")?;
            let side = PickSide::parse(raw_side)
                .ok_or_else(|| anyhow!("unknown side '{raw_side}', expected home, draw or away"))?;
            let m = client
                .fetch_admin_matches(date)?
                .into_iter()
                .find(|m| m.id == *match_id)
                .ok_or_else(|| anyhow!("match {match_id} not found on {date}"))?;
            let prediction = prediction_for(&m, side);
            client.submit_admin_prediction(&m.id, &prediction)?;
            println!("Official prediction for {} set to {}", m.id, prediction.team);
        }
        "admin-reset" => {
            if !has_flag(&args, "--yes") {
                bail!("this clears every vote and prediction; rerun with --yes to confirm");
            }
            client
                .reset_predictions()
                .context("Failed to reset predictions. Please try again.")?;
            println!("All predictions and votes have been reset successfully.");
        }
        other => bail!("unknown command '{other}'\n{USAGE}"),
    }
    Ok(())
}

fn print_matches(client: &ApiClient, date: NaiveDate) -> Result<()> {
    let feed = build_feed(client, date)?;
    for (id, err) in &feed.vote_errors {
        eprintln!("warn: vote split unavailable for {id}: {err}");
    }
    if feed.groups.is_empty() {
        println!("No matches for {}", date.format("%d/%m/%Y"));
    }
    for group in &feed.groups {
        println!("== {} ==", group.name);
        for m in &group.matches {
            let score = m
                .final_score()
                .map(|(h, a)| format!("{h} - {a}"))
                .unwrap_or_else(|| "vs".to_string());
            let fans = m.fans_prediction.as_ref().map(|p| p.team.as_str()).unwrap_or("-");
            let official = m.admin_prediction.as_ref().map(|p| p.team.as_str()).unwrap_or("-");
            println!(
                "{}\t{} {score} {}\t{}\tFans: {fans}{}\tAI: {official}{}",
                m.id,
                m.home_team.name,
                m.away_team.name,
                m.status,
                verdict_mark(fans_prediction_correct(m)),
                verdict_mark(admin_prediction_correct(m)),
            );
        }
    }
    Ok(())
}

fn print_profile(client: &ApiClient) -> Result<()> {
    let (profile, report, errors) = load_profile_report(client)?;
    for (id, err) in errors {
        eprintln!("warn: match details unavailable for {id}: {err}");
    }
    println!("Username: {}", profile.username);
    println!("Total Votes: {}", report.total_votes);
    println!("Votes on Finished Matches: {}", report.decided);
    println!("Correct Predictions: {}", report.correct);
    println!("Overall Accuracy: {:.2}%", report.overall_accuracy);
    println!();
    for league in &report.leagues {
        println!(
            "{}\t{}/{}\t{:.2}%",
            league.name, league.correct, league.total, league.accuracy
        );
    }
    Ok(())
}

/// Flags the Google follow-up needs; both when the server did not say which.
fn missing_profile_flags(needs_username: bool, needs_country: bool) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if needs_username {
        missing.push("--username");
    }
    if needs_country {
        missing.push("--country");
    }
    if missing.is_empty() {
        missing = vec!["--username", "--country"];
    }
    missing
}

fn verdict_mark(verdict: Option<bool>) -> &'static str {
    match verdict {
        Some(true) => " (correct)",
        Some(false) => " (wrong)",
        None => "",
    }
}

fn save(path: &Option<PathBuf>, client: &ApiClient) -> Result<()> {
    match path {
        Some(path) => persist::save_session(path, client.session()),
        None => Ok(()),
    }
}

fn expect_args<'a, const N: usize>(rest: &[&'a str], usage: &str) -> Result<[&'a str; N]> {
    rest.get(..N)
        .and_then(|slice| <[&'a str; N]>::try_from(slice).ok())
        .ok_or_else(|| anyhow!("usage: wkb_cli {usage}"))
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    args.iter()
        .find_map(|a| a.strip_prefix(&prefix))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_date_arg(args: &[String]) -> Result<Option<NaiveDate>> {
    let Some(raw) = flag_value(args, "--date") else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map(Some)
        .with_context(|| format!("invalid --date '{raw}', expected YYYY-MM-DD"))
}
