//! Input validators. Each returns the normalized value or
//! [`DeployError::InvalidInput`] with a message fit for the
//! operator.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DeployError, DeployResult};

// The last path segment becomes the project name used in remote
// scripts.
static REPO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://[^\s@]+/[A-Za-z0-9._-]+\.git$").expect("repository URL regex is valid")
});

// Four numeric octets. Octet values are not bounded to 0-255.
static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{1,3}(\.[0-9]{1,3}){3}$").expect("IPv4 regex is valid")
});

/// An HTTPS URL ending in `.git` whose last segment holds only
/// ASCII letters, digits, `.`, `_` and `-`.
///
/// # Errors
///
/// Returns [`DeployError::InvalidInput`] for any other URL.
pub fn repo_url(input: &str) -> DeployResult<String> {
    let url = input.trim();
    if REPO_URL.is_match(url) {
        Ok(url.to_string())
    } else {
        Err(DeployError::InvalidInput(format!(
            "'{url}' is not an HTTPS repository URL ending in .git"
        )))
    }
}

/// Four dot-separated groups of one to three digits.
///
/// # Errors
///
/// Returns [`DeployError::InvalidInput`] for any other shape.
pub fn ip_address(input: &str) -> DeployResult<String> {
    let ip = input.trim();
    if IPV4.is_match(ip) {
        Ok(ip.to_string())
    } else {
        Err(DeployError::InvalidInput(format!(
            "'{ip}' is not an IPv4 address"
        )))
    }
}

/// An integer in `1..=65535`.
///
/// # Errors
///
/// Returns [`DeployError::InvalidInput`] for anything else.
pub fn port(input: &str) -> DeployResult<u16> {
    let raw = input.trim();
    let invalid = || DeployError::InvalidInput(format!("'{raw}' is not a port between 1 and 65535"));

    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match raw.parse::<u16>() {
        Ok(0) | Err(_) => Err(invalid()),
        Ok(p) => Ok(p),
    }
}

/// A non-empty name without whitespace or `@`.
///
/// # Errors
///
/// Returns [`DeployError::InvalidInput`] for a blank or malformed name.
pub fn username(input: &str) -> DeployResult<String> {
    let user = input.trim();
    if user.is_empty() {
        return Err(DeployError::InvalidInput("username must not be empty".into()));
    }
    if user.chars().any(char::is_whitespace) || user.contains('@') {
        return Err(DeployError::InvalidInput(format!(
            "'{user}' is not a valid username"
        )));
    }
    Ok(user.to_string())
}

/// Branch name, falling back to `main` when blank.
#[must_use]
pub fn branch(input: &str) -> String {
    let branch = input.trim();
    if branch.is_empty() {
        "main".to_string()
    } else {
        branch.to_string()
    }
}

/// Expand a leading `~` to the home directory.
#[must_use]
pub fn expand_home(input: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (input, home) {
        ("~", Some(home)) => home,
        (path, Some(home)) if path.starts_with("~/") => home.join(&path[2..]),
        (path, _) => PathBuf::from(path),
    }
}

/// A path (after `~` expansion) naming an existing file.
///
/// # Errors
///
/// Returns [`DeployError::InvalidInput`] when no such file exists.
pub fn key_path(input: &str) -> DeployResult<PathBuf> {
    let raw = input.trim();
    let path = expand_home(raw);
    if Path::new(&path).is_file() {
        Ok(path)
    } else {
        Err(DeployError::InvalidInput(format!(
            "SSH key '{}' does not exist",
            path.display()
        )))
    }
}
