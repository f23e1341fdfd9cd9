use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::session::Session;

const CONFIG_DIR: &str = "wkb_terminal";
const SESSION_FILE: &str = "session.json";
const SESSION_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct SessionFile {
    version: u32,
    session: Session,
}

/// Stored session, or an anonymous one when nothing usable is on disk.
pub fn load_session(path: &Path) -> Session {
    let Ok(raw) = fs::read_to_string(path) else {
        return Session::anonymous();
    };
    let Ok(file) = serde_json::from_str::<SessionFile>(&raw) else {
        return Session::anonymous();
    };
    if file.version != SESSION_VERSION || !file.session.is_authenticated() {
        return Session::anonymous();
    }
    file.session
}

pub fn save_session(path: &Path, session: &Session) -> Result<()> {
    if !session.is_authenticated() {
        return clear_session(path);
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).context("create session dir")?;
    }
    let file = SessionFile {
        version: SESSION_VERSION,
        session: session.clone(),
    };
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(&file).context("serialize session")?;
    fs::write(&tmp, json).context("write session")?;
    fs::rename(&tmp, path).context("swap session file")?;
    Ok(())
}

pub fn clear_session(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).context("remove session file"),
    }
}

/// `$XDG_CONFIG_HOME/wkb_terminal/session.json`, falling back to `~/.config`.
pub fn default_session_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CONFIG_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CONFIG_DIR).join(SESSION_FILE));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR)
            .join(SESSION_FILE),
    )
}
