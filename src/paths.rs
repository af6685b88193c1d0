use std::{env, path::PathBuf};

/// Directory inside each repository whose files the robot manages.
pub const WORKFLOWS_DIR: &str = ".github/workflows";

/// Root-level file that marks a repository as a Go project.
pub const MARKER_FILE: &str = "go.mod";

/// Template directory used when neither the CLI nor the config names one.
pub const DEFAULT_TEMPLATES_DIR: &str = "templates";

/// `$XDG_CONFIG_HOME/robot`, falling back to `$HOME/.config/robot`.
pub fn robot_home() -> PathBuf {
    let xdg = env::var_os("XDG_CONFIG_HOME");
    let base = xdg
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env::var_os("HOME").unwrap_or_default()).join(".config"));
    base.join("robot")
}

pub fn config_path() -> PathBuf {
    robot_home().join("config.toml")
}

/// Path of a managed workflow file.
pub fn workflow_path(name: &str) -> String {
    format!("{}/{}", WORKFLOWS_DIR, name)
}
