//! Path utilities for the IndexBot data directory.

use anyhow::Result;
use std::path::PathBuf;

const INDEXBOT_DIR: &str = ".indexbot";
const DB_FILE: &str = "indexbot.db";
const SEARCH_INDEX_DIR: &str = "search_index";
const LOGS_DIR: &str = "logs";

/// Environment variable to override the data directory.
pub const INDEXBOT_DIR_ENV: &str = "INDEXBOT_DIR";

/// Resolve the data directory.
/// Priority: INDEXBOT_DIR env var > ~/.indexbot/
pub fn resolve_indexbot_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(INDEXBOT_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(INDEXBOT_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Ensure the data directory exists and return its path.
pub fn ensure_indexbot_dir() -> Result<PathBuf> {
    let dir = resolve_indexbot_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// ~/.indexbot/indexbot.db
pub fn database_path() -> Result<PathBuf> {
    Ok(ensure_indexbot_dir()?.join(DB_FILE))
}

/// ~/.indexbot/search_index/
pub fn search_index_dir() -> Result<PathBuf> {
    let dir = ensure_indexbot_dir()?.join(SEARCH_INDEX_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// ~/.indexbot/logs/
pub fn logs_dir() -> Result<PathBuf> {
    let dir = ensure_indexbot_dir()?.join(LOGS_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_env_override_wins() {
        let _guard = ENV_LOCK.lock().unwrap();
        let temp_dir = tempfile::tempdir().unwrap();
        let previous = std::env::var_os(INDEXBOT_DIR_ENV);
        unsafe { std::env::set_var(INDEXBOT_DIR_ENV, temp_dir.path()) };

        assert_eq!(resolve_indexbot_dir().unwrap(), temp_dir.path());
        assert_eq!(database_path().unwrap(), temp_dir.path().join(DB_FILE));
        assert!(search_index_dir().unwrap().is_dir());
        assert!(logs_dir().unwrap().is_dir());

        match previous {
            Some(value) => unsafe { std::env::set_var(INDEXBOT_DIR_ENV, value) },
            None => unsafe { std::env::remove_var(INDEXBOT_DIR_ENV) },
        }
    }

    #[test]
    fn test_blank_env_falls_back_to_home() {
        let _guard = ENV_LOCK.lock().unwrap();
        let previous = std::env::var_os(INDEXBOT_DIR_ENV);
        unsafe { std::env::set_var(INDEXBOT_DIR_ENV, "   ") };

        let dir = resolve_indexbot_dir().unwrap();
        assert!(dir.ends_with(INDEXBOT_DIR));

        match previous {
            Some(value) => unsafe { std::env::set_var(INDEXBOT_DIR_ENV, value) },
            None => unsafe { std::env::remove_var(INDEXBOT_DIR_ENV) },
        }
    }
}
