use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use wkb_terminal::admin::{PickSide, prediction_for};
use wkb_terminal::api::ApiClient;
use wkb_terminal::config::{AppConfig, load_dotenv};
use wkb_terminal::models::{Match, MatchStatus, PredictionStats, VoteChoice};
use wkb_terminal::outcome::{admin_prediction_correct, fans_prediction_correct};
use wkb_terminal::persist;
use wkb_terminal::provider::spawn_provider;
use wkb_terminal::state::{
    AppState, AuthMode, Delta, FormField, ProviderCommand, Screen, SessionUser, apply_delta,
};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    feed_refresh: Duration,
    last_feed_refresh: Instant,
}

impl App {
    fn new(state: AppState, cmd_tx: Option<mpsc::Sender<ProviderCommand>>, feed_refresh: Duration) -> Self {
        Self {
            state,
            should_quit: false,
            cmd_tx,
            feed_refresh,
            last_feed_refresh: Instant::now(),
        }
    }

    fn send(&mut self, cmd: ProviderCommand, what: &str) -> bool {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log(format!("[INFO] {what} unavailable"));
            return false;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log(format!("[WARN] {what} request failed"));
            return false;
        }
        true
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.reset.is_armed() {
            self.on_reset_key(key);
            return;
        }
        if self.state.screen == Screen::Login {
            self.on_login_key(key);
            return;
        }

        self.state.flash = None;
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Left | KeyCode::Char('[') => self.shift_day(-1),
            KeyCode::Right | KeyCode::Char(']') => self.shift_day(1),
            KeyCode::Char('t') => match self.state.screen {
                Screen::Admin => {
                    let delta = (self.state.today - self.state.admin_date).num_days();
                    self.state.shift_admin_date(delta);
                }
                _ => self.state.jump_to_today(),
            },
            KeyCode::Char('r') => self.refresh_current(),
            KeyCode::Char('h') => self.pick(VoteChoice::Home),
            KeyCode::Char('d') => self.pick(VoteChoice::Draw),
            KeyCode::Char('a') => self.pick(VoteChoice::Away),
            KeyCode::Char('m') | KeyCode::Esc => self.state.screen = Screen::Matches,
            KeyCode::Char('p') => self.toggle_profile(),
            KeyCode::Char('A') => self.toggle_admin(),
            KeyCode::Char('R') if self.state.screen == Screen::Admin => self.state.reset.request(),
            KeyCode::Char('l') if !self.state.is_logged_in() => {
                self.state.login.error = None;
                self.state.screen = Screen::Login;
            }
            KeyCode::Char('o') if self.state.is_logged_in() => {
                self.send(ProviderCommand::Logout, "Logout");
            }
            _ => {}
        }
    }

    fn on_reset_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                if self.state.reset.confirm() {
                    self.state.push_log("[INFO] Reset requested");
                    self.send(ProviderCommand::ResetPredictions, "Reset");
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.state.reset.cancel(),
            _ => {}
        }
    }

    fn on_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.state.screen = Screen::Matches,
            KeyCode::Enter => self.submit_login(),
            KeyCode::Tab | KeyCode::Down => self.state.login.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.state.login.focus_prev(),
            KeyCode::F(2) => self.state.login.toggle_mode(),
            KeyCode::Backspace => self.state.login.backspace(),
            KeyCode::Char(ch) => self.state.login.input(ch),
            _ => {}
        }
    }

    fn submit_login(&mut self) {
        let form = &mut self.state.login;
        if form.submitting {
            return;
        }
        if let Err(msg) = form.validate() {
            form.error = Some(msg);
            return;
        }
        form.error = None;
        form.notice = None;
        form.submitting = true;
        let cmd = match form.mode {
            AuthMode::Login => ProviderCommand::Login {
                username: form.username.trim().to_string(),
                password: form.password.clone(),
            },
            AuthMode::Register => ProviderCommand::Register {
                username: form.username.trim().to_string(),
                password: form.password.clone(),
                email: Some(form.email.trim().to_string()).filter(|e| !e.is_empty()),
                country: form.country.trim().to_string(),
            },
        };
        if !self.send(cmd, "Authentication") {
            self.state.login.submitting = false;
        }
    }

    fn shift_day(&mut self, days: i64) {
        match self.state.screen {
            Screen::Admin => self.state.shift_admin_date(days),
            _ => self.state.shift_date(days),
        }
    }

    fn pick(&mut self, choice: VoteChoice) {
        match self.state.screen {
            Screen::Matches => self.cast_vote(choice),
            Screen::Admin => self.admin_predict(choice),
            _ => {}
        }
    }

    fn cast_vote(&mut self, choice: VoteChoice) {
        match self.state.begin_vote() {
            Ok(match_id) => {
                let epoch = self.state.session_epoch;
                let sent = self.send(
                    ProviderCommand::CastVote {
                        epoch,
                        match_id: match_id.clone(),
                        choice,
                    },
                    "Vote",
                );
                if !sent {
                    self.state.vote_gate.abandon(&match_id);
                }
            }
            Err(rejection) => self.state.flash = Some(rejection.to_string()),
        }
    }

    fn admin_predict(&mut self, choice: VoteChoice) {
        let Some(m) = self.state.selected_admin_match() else {
            return;
        };
        let side = match choice {
            VoteChoice::Home => PickSide::Home,
            VoteChoice::Draw => PickSide::Draw,
            VoteChoice::Away => PickSide::Away,
        };
        let prediction = prediction_for(m, side);
        let match_id = m.id.clone();
        self.send(
            ProviderCommand::AdminPredict {
                match_id,
                prediction,
            },
            "Admin prediction",
        );
    }

    fn toggle_profile(&mut self) {
        if !self.state.is_logged_in() {
            self.state.flash = Some("Please log in first".to_string());
            return;
        }
        if self.state.screen == Screen::Profile {
            self.state.screen = Screen::Matches;
            return;
        }
        self.state.screen = Screen::Profile;
        self.state.profile_scroll = 0;
        self.request_profile();
    }

    fn toggle_admin(&mut self) {
        if !self.state.is_admin() {
            return;
        }
        self.state.screen = if self.state.screen == Screen::Admin {
            Screen::Matches
        } else {
            self.state.admin_stale = true;
            Screen::Admin
        };
    }

    fn request_profile(&mut self) {
        let epoch = self.state.begin_profile_load();
        if !self.send(ProviderCommand::FetchProfile { epoch }, "Profile") {
            self.state.profile_loading = false;
        }
    }

    fn refresh_current(&mut self) {
        match self.state.screen {
            Screen::Matches => self.state.feed_stale = true,
            Screen::Admin => self.state.admin_stale = true,
            Screen::Profile => self.request_profile(),
            Screen::Login => {}
        }
        self.state.stats_stale = true;
    }

    fn maybe_refresh(&mut self) {
        let live_due = self.state.screen == Screen::Matches
            && self.state.feed.has_live()
            && self.last_feed_refresh.elapsed() >= self.feed_refresh;
        if self.state.feed_stale || live_due {
            let date = self.state.date;
            let seq = self.state.next_feed_seq();
            if !self.send(ProviderCommand::FetchFeed { date, seq }, "Matches") {
                self.state.feed_loading = false;
            }
            self.last_feed_refresh = Instant::now();
        }

        if self.state.screen == Screen::Admin && self.state.admin_stale {
            let date = self.state.admin_date;
            let seq = self.state.next_admin_seq();
            if !self.send(ProviderCommand::FetchAdminMatches { date, seq }, "Admin matches") {
                self.state.admin_loading = false;
            }
        }

        if self.state.profile_stale && self.state.is_logged_in() {
            self.request_profile();
        }

        if self.state.stats_stale {
            self.state.stats_stale = false;
            self.send(ProviderCommand::FetchStats, "Stats");
        }
    }
}

fn main() -> io::Result<()> {
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

    let mut state = AppState::new(Local::now().date_naive());
    if session.is_authenticated() {
        state.user = Some(SessionUser {
            user_id: session.user_id.clone().unwrap_or_default(),
            username: session.username.clone(),
            is_admin: false,
        });
    }

    let client = match ApiClient::new(&config, session) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("error: {err:#}");
            return Ok(());
        }
    };

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let _provider = spawn_provider(client, session_path, tx, cmd_rx);

    let mut app = App::new(state, Some(cmd_tx), config.feed_refresh);
    app.state.profile_stale = app.state.is_logged_in();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        app.maybe_refresh();

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
        ])
        .split(area);

    let header = Paragraph::new(header_lines(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Matches => render_matches(frame, chunks[1], &app.state),
        Screen::Profile => render_profile(frame, chunks[1], &app.state),
        Screen::Admin => render_admin(frame, chunks[1], &app.state),
        Screen::Login => render_login(frame, chunks[1], &app.state),
    }

    let footer = Paragraph::new(footer_lines(&app.state))
        .block(Block::default().borders(Borders::TOP))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[2]);

    if app.state.reset.is_armed() {
        render_reset_overlay(frame, area);
    }
    if app.state.help_overlay {
        render_help_overlay(frame, area);
    }
}

fn header_lines(state: &AppState) -> Vec<Line<'static>> {
    let who = match &state.user {
        Some(user) => format!(
            "Welcome, {}{}",
            user.username.as_deref().unwrap_or("user"),
            if user.is_admin { " (admin)" } else { "" }
        ),
        None => "Not logged in".to_string(),
    };
    let title = Line::from(vec![
        Span::styled("WE KNOW BETTER", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(" | {} | {who}", screen_label(state.screen))),
    ]);
    let stats = match (&state.stats, &state.stats_error) {
        (Some(stats), _) => stats_line(stats),
        (None, Some(err)) => Line::styled(err.clone(), Style::default().fg(Color::Red)),
        (None, None) => Line::raw("Loading statistics..."),
    };
    vec![title, stats]
}

fn stats_line(stats: &PredictionStats) -> Line<'static> {
    let mut spans = vec![Span::raw(format!(
        "Fans today: {:.2}% ",
        stats.today.user_accuracy
    ))];
    spans.push(trend_span(stats.user_trend));
    spans.push(Span::raw(format!(
        "   Official today: {:.2}% ",
        stats.today.admin_accuracy
    )));
    spans.push(trend_span(stats.admin_trend));
    Line::from(spans)
}

fn trend_span(trend: f64) -> Span<'static> {
    let (arrow, color) = if trend >= 0.0 {
        ("▲", Color::Green)
    } else {
        ("▼", Color::Red)
    };
    Span::styled(
        format!("{arrow} {:.2}%", trend.abs()),
        Style::default().fg(color),
    )
}

fn footer_lines(state: &AppState) -> Vec<Line<'static>> {
    let keys = match state.screen {
        Screen::Matches => {
            "←/→ Day | t Today | j/k Move | h/d/a Vote | p Profile | A Admin | l Login | o Logout | r Refresh | ? Help | q Quit"
        }
        Screen::Profile => "j/k Scroll | r Refresh | p/m Matches | o Logout | ? Help | q Quit",
        Screen::Admin => {
            "←/→ Day | t Today | j/k Move | h/d/a Predict | R Reset all | A/m Matches | ? Help | q Quit"
        }
        Screen::Login => "Tab/↑/↓ Field | F2 Login/Register | Enter Submit | Esc Back",
    };
    let mut lines = vec![Line::raw(keys)];
    if let Some(flash) = &state.flash {
        lines.push(Line::styled(flash.clone(), Style::default().fg(Color::Yellow)));
    }
    let recent: Vec<&String> = state.logs.iter().rev().take(2).collect();
    for msg in recent.into_iter().rev() {
        lines.push(Line::styled(msg.clone(), Style::default().fg(Color::DarkGray)));
    }
    lines
}

fn render_matches(frame: &mut Frame, area: Rect, state: &AppState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let mut date_line = format!("Selected Date: {}", state.date.format("%d/%m/%Y"));
    if state.date == state.today {
        date_line.push_str(" (today)");
    }
    if state.feed_loading {
        date_line.push_str("  loading...");
    }
    frame.render_widget(
        Paragraph::new(date_line).style(Style::default().add_modifier(Modifier::BOLD)),
        sections[0],
    );

    let list_area = sections[1];
    if state.feed.groups.is_empty() {
        let text = if state.feed_loading {
            "Loading..."
        } else {
            "No matches for this date"
        };
        frame.render_widget(
            Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
            list_area,
        );
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    let mut selected_line = 0usize;
    let mut idx = 0usize;
    for group in &state.feed.groups {
        lines.push(Line::styled(
            group.name.clone(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
        for m in &group.matches {
            let selected = idx == state.selected;
            if selected {
                selected_line = lines.len();
            }
            lines.push(match_line(m, selected));
            lines.push(prediction_line(m, state));
            idx += 1;
        }
        lines.push(Line::raw(""));
    }

    let visible = list_area.height as usize;
    let (start, _) = visible_range(selected_line, lines.len(), visible);
    let paragraph = Paragraph::new(lines).scroll((start as u16, 0));
    frame.render_widget(paragraph, list_area);
}

fn match_line(m: &Match, selected: bool) -> Line<'static> {
    let style = if selected {
        Style::default().fg(Color::White).bg(Color::DarkGray)
    } else {
        Style::default()
    };
    let prefix = if selected { "> " } else { "  " };
    Line::styled(
        format!(
            "{prefix}{:>24} {:^9} {:<24} {}",
            truncate(&m.home_team.name, 24),
            score_text(m),
            truncate(&m.away_team.name, 24),
            m.status
        ),
        style,
    )
}

fn prediction_line(m: &Match, state: &AppState) -> Line<'static> {
    let mut spans = vec![Span::raw("    ")];
    let fans = m
        .fans_prediction
        .as_ref()
        .map(|p| p.team.clone())
        .unwrap_or_else(|| "-".to_string());
    spans.push(Span::styled(
        format!("Fans: {fans}"),
        verdict_style(fans_prediction_correct(m)),
    ));
    spans.push(Span::raw("   "));
    let official = m
        .admin_prediction
        .as_ref()
        .map(|p| p.team.clone())
        .unwrap_or_else(|| "-".to_string());
    spans.push(Span::styled(
        format!("AI: {official}"),
        verdict_style(admin_prediction_correct(m)),
    ));

    if m.status.is_open_for_votes() {
        let voted = state.vote_gate.has_voted(&m.id);
        let pending = state.vote_gate.is_pending(&m.id);
        spans.push(Span::raw("   "));
        for choice in VoteChoice::ALL {
            let pct = voted.then(|| m.vote_percentages.map(|p| p.get(choice)).unwrap_or(0.0));
            let text = vote_button_text(choice, pct);
            let style = match (voted || pending, choice) {
                (true, _) => Style::default().fg(Color::DarkGray),
                (false, VoteChoice::Home) => Style::default().fg(Color::Blue),
                (false, VoteChoice::Draw) => Style::default().fg(Color::Gray),
                (false, VoteChoice::Away) => Style::default().fg(Color::Red),
            };
            spans.push(Span::styled(text, style));
        }
        if pending {
            spans.push(Span::raw("sending..."));
        }
    }
    Line::from(spans)
}

/// Percentages keep the server's two-decimal precision and only show once voted.
fn vote_button_text(choice: VoteChoice, pct: Option<f64>) -> String {
    match pct {
        Some(pct) => format!("[{} {pct:.2}%] ", choice.label()),
        None => format!("[{}] ", choice.label()),
    }
}

fn verdict_style(verdict: Option<bool>) -> Style {
    match verdict {
        Some(true) => Style::default().fg(Color::Black).bg(Color::Green),
        Some(false) => Style::default().fg(Color::Black).bg(Color::Red),
        None => Style::default().fg(Color::Gray),
    }
}

fn score_text(m: &Match) -> String {
    if m.status.is_live() || m.status == MatchStatus::Finished {
        let line = m.score.and_then(|s| s.full_time).unwrap_or_default();
        return format!("{} - {}", line.home.unwrap_or(0), line.away.unwrap_or(0));
    }
    kickoff_time(&m.utc_date)
}

fn kickoff_time(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(dt) => dt.with_timezone(&Local).format("%H:%M").to_string(),
        Err(_) => raw
            .trim()
            .get(11..16)
            .map(str::to_string)
            .unwrap_or_else(|| "TBD".to_string()),
    }
}

fn render_profile(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("User Profile").borders(Borders::ALL);
    if let Some(err) = &state.profile_error {
        let p = Paragraph::new(err.clone())
            .style(Style::default().fg(Color::Red))
            .block(block);
        frame.render_widget(p, area);
        return;
    }
    let (Some(profile), Some(report)) = (&state.profile, &state.report) else {
        frame.render_widget(Paragraph::new("Loading...").block(block), area);
        return;
    };

    let mut lines = vec![
        Line::raw(format!("Username: {}", profile.username)),
        Line::raw(format!(
            "Country: {}",
            profile.country.as_deref().unwrap_or("-")
        )),
        Line::raw(format!("Total Votes: {}", report.total_votes)),
        Line::raw(format!("Votes on Finished Matches: {}", report.decided)),
        Line::raw(format!("Correct Predictions: {}", report.correct)),
        Line::raw(format!("Overall Accuracy: {:.2}%", report.overall_accuracy)),
        Line::raw(""),
        Line::styled(
            "Prediction Accuracy by League",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Line::raw(format!(
            "{:<28} {:>6} {:>8} {:>9}",
            "League", "Votes", "Correct", "Accuracy"
        )),
    ];
    for league in &report.leagues {
        lines.push(Line::raw(format!(
            "{:<28} {:>6} {:>8} {:>8.2}%",
            truncate(&league.name, 28),
            league.total,
            league.correct,
            league.accuracy
        )));
    }

    lines.push(Line::raw(""));
    lines.push(Line::styled(
        "Voting History",
        Style::default().add_modifier(Modifier::BOLD),
    ));
    for record in &report.history {
        let (verdict, style) = match record.correct {
            Some(true) => ("Correct", Style::default().fg(Color::Green)),
            Some(false) => ("Incorrect", Style::default().fg(Color::Red)),
            None => ("Pending", Style::default().fg(Color::Gray)),
        };
        let text = match &record.fixture {
            Some(m) => format!(
                "{}: {} vs {}, Vote: {}, {verdict}",
                m.competition.name, m.home_team.name, m.away_team.name, record.choice
            ),
            None => format!("Match {}: details unavailable, Vote: {}", record.match_id, record.choice),
        };
        lines.push(Line::styled(text, style));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((state.profile_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_admin(frame: &mut Frame, area: Rect, state: &AppState) {
    let title = format!("Admin Panel | {}", state.admin_date.format("%d/%m/%Y"));
    let block = Block::default().title(title).borders(Borders::ALL);
    if state.admin_loading && state.admin_matches.is_empty() {
        frame.render_widget(Paragraph::new("Loading...").block(block), area);
        return;
    }
    if state.admin_matches.is_empty() {
        frame.render_widget(
            Paragraph::new("No matches found for this date.").block(block),
            area,
        );
        return;
    }

    let mut lines = Vec::new();
    for (idx, m) in state.admin_matches.iter().enumerate() {
        let selected = idx == state.admin_selected;
        let style = if selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        let prefix = if selected { "> " } else { "  " };
        lines.push(Line::styled(
            format!(
                "{prefix}{}  {:<22} {} vs {}",
                kickoff_time(&m.utc_date),
                truncate(&m.competition.name, 22),
                m.home_team.name,
                m.away_team.name
            ),
            style,
        ));
        if let Some(prediction) = &m.admin_prediction {
            lines.push(Line::styled(
                format!("      Current Prediction: {}", prediction.team),
                Style::default().fg(Color::Green),
            ));
        }
    }
    let inner_height = area.height.saturating_sub(2) as usize;
    let selected_line = state
        .admin_matches
        .iter()
        .take(state.admin_selected)
        .map(|m| if m.admin_prediction.is_some() { 2 } else { 1 })
        .sum::<usize>();
    let (start, _) = visible_range(selected_line, lines.len(), inner_height);
    frame.render_widget(
        Paragraph::new(lines).block(block).scroll((start as u16, 0)),
        area,
    );
}

fn render_login(frame: &mut Frame, area: Rect, state: &AppState) {
    let form = &state.login;
    let popup = centered_rect(50, 60, area);
    let title = match form.mode {
        AuthMode::Login => "Login",
        AuthMode::Register => "Sign Up",
    };
    let block = Block::default().title(title).borders(Borders::ALL);

    let mut lines = Vec::new();
    for field in form.fields() {
        let (label, value) = match field {
            FormField::Username => ("Username", form.username.clone()),
            FormField::Password => ("Password", "*".repeat(form.password.chars().count())),
            FormField::Email => ("Email (optional)", form.email.clone()),
            FormField::Country => ("Country", form.country.clone()),
        };
        let focused = *field == form.focus;
        let style = if focused {
            Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default()
        };
        let cursor = if focused { "_" } else { "" };
        lines.push(Line::styled(format!("{label}: {value}{cursor}"), style));
    }
    lines.push(Line::raw(""));
    if form.submitting {
        lines.push(Line::raw("Submitting..."));
    }
    if let Some(err) = &form.error {
        lines.push(Line::styled(err.clone(), Style::default().fg(Color::Red)));
    }
    if let Some(notice) = &form.notice {
        lines.push(Line::styled(notice.clone(), Style::default().fg(Color::Green)));
    }

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false }),
        popup,
    );
}

fn render_reset_overlay(frame: &mut Frame, area: Rect) {
    let popup = centered_rect(50, 30, area);
    frame.render_widget(Clear, popup);
    let text = [
        "Are you sure you want to reset all predictions and votes?",
        "This action cannot be undone.",
        "",
        "y Confirm Reset    n / Esc Cancel",
    ]
    .join("\n");
    let p = Paragraph::new(text)
        .block(
            Block::default()
                .title("Confirm Reset")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(p, popup);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "We Know Better - Help",
        "",
        "Matches:",
        "  ← / →        Previous / next day",
        "  t            Today",
        "  j/k or ↑/↓   Move",
        "  h / d / a    Vote home / draw / away",
        "  r            Refresh",
        "",
        "Account:",
        "  l            Login / sign up",
        "  p            Profile",
        "  o            Logout",
        "",
        "Admin:",
        "  A            Admin panel",
        "  h / d / a    Official prediction",
        "  R            Reset all predictions",
        "",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn screen_label(screen: Screen) -> &'static str {
    match screen {
        Screen::Matches => "MATCHES",
        Screen::Profile => "PROFILE",
        Screen::Admin => "ADMIN",
        Screen::Login => "LOGIN",
    }
}

fn truncate(raw: &str, max: usize) -> String {
    if raw.chars().count() <= max {
        return raw.to_string();
    }
    let mut out: String = raw.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
