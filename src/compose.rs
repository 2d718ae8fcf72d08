use std::path::{Path, PathBuf};

use docker_compose_types::Compose;

use crate::error::DeployResult;

/// Compose manifest names, in lookup order.
pub const MANIFESTS: [&str; 2] = ["docker-compose.yml", "docker-compose.yaml"];

/// First compose manifest present in `dir`.
#[must_use]
pub fn find_manifest(dir: &Path) -> Option<PathBuf> {
    MANIFESTS
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Parse a compose manifest.
///
/// # Errors
///
/// Returns an error if the content is not a valid compose document.
pub fn parse(content: &str) -> DeployResult<Compose> {
    Ok(serde_yaml::from_str(content)?)
}

/// Service names declared in a compose manifest, in file order.
///
/// # Errors
///
/// Returns an error if the content is not a valid compose document.
pub fn service_names(content: &str) -> DeployResult<Vec<String>> {
    let compose = parse(content)?;
    Ok(compose.services.0.keys().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_services_in_order() {
        let yaml = "\
services:
  web:
    build: .
    ports:
      - \"3000:3000\"
  db:
    image: postgres:16
";
        assert_eq!(service_names(yaml).unwrap(), vec!["web", "db"]);
    }

    #[test]
    fn prefers_yml_over_yaml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("docker-compose.yaml"), "services: {}\n").unwrap();
        std::fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();

        let found = find_manifest(dir.path()).unwrap();

        assert_eq!(found.file_name().unwrap(), "docker-compose.yml");
    }

    #[test]
    fn none_when_absent() {
        let dir = tempfile::tempdir().unwrap();

        assert!(find_manifest(dir.path()).is_none());
    }
}
