//! Path resolution for the database and config file.

fn home_file(name: &str) -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    format!("{home}/.taskdeck/{name}")
}

/// Resolve the database path.
/// Checks `TASKDECK_DB` env var, falls back to `$HOME/.taskdeck/taskdeck.db`.
pub fn db_path() -> String {
    std::env::var("TASKDECK_DB").unwrap_or_else(|_| home_file("taskdeck.db"))
}

/// Resolve the config file path.
/// Checks `TASKDECK_CONFIG` env var, falls back to `$HOME/.taskdeck/config.toml`.
pub fn config_path() -> String {
    std::env::var("TASKDECK_CONFIG").unwrap_or_else(|_| home_file("config.toml"))
}

/// Create the parent directory of `path` if it is missing.
pub fn ensure_parent_dir(path: &str) -> std::io::Result<()> {
    match std::path::Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            std::fs::create_dir_all(parent)
        }
        _ => Ok(()),
    }
}
