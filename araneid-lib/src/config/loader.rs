use std::path::Path;

use crate::error::{AraneidError, Result};

use super::root::Config;

/// Reads and validates a topology file.
///
/// Validation happens here rather than being left to callers because
/// every consumer of a `Config` (the scheduler setup, the bridge
/// provisioner) needs referential integrity to already hold — a link
/// naming a host that doesn't exist should fail fast at load time, not
/// wherever the first lookup happens to miss.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(AraneidError::Io)?;
    let config: Config = toml::from_str(&contents).map_err(AraneidError::TomlParse)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.hosts.is_empty() {
        return Err(AraneidError::Configuration("topology must declare at least one host".into()));
    }

    let mut seen = std::collections::HashSet::new();
    for host in &config.hosts {
        if !seen.insert(host.name.as_str()) {
            return Err(AraneidError::Configuration(format!("duplicate host name: {}", host.name)));
        }
    }

    let known = config.host_names();
    for link in &config.links {
        if !known.contains_key(link.from.as_str()) {
            return Err(AraneidError::Configuration(format!(
                "link references unknown host: {}",
                link.from
            )));
        }
        if !known.contains_key(link.to.as_str()) {
            return Err(AraneidError::Configuration(format!(
                "link references unknown host: {}",
                link.to
            )));
        }
        if !(0.0..=1.0).contains(&link.loss) {
            return Err(AraneidError::Configuration(format!(
                "link {} -> {} has out-of-range loss rate {}",
                link.from, link.to, link.loss
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_a_minimal_topology() {
        let file = write_temp(
            r#"
            [[hosts]]
            name = "a"
            address = "10.0.0.1"

            [[hosts]]
            name = "b"
            address = "10.0.0.2"

            [[links]]
            from = "a"
            to = "b"
            "#,
        );
        let config = load_from_path(file.path()).unwrap();
        assert_eq!(config.hosts.len(), 2);
        assert_eq!(config.links.len(), 1);
    }

    #[test]
    fn rejects_link_to_unknown_host() {
        let file = write_temp(
            r#"
            [[hosts]]
            name = "a"
            address = "10.0.0.1"

            [[links]]
            from = "a"
            to = "ghost"
            "#,
        );
        assert!(load_from_path(file.path()).is_err());
    }

    #[test]
    fn rejects_duplicate_host_names() {
        let file = write_temp(
            r#"
            [[hosts]]
            name = "a"
            address = "10.0.0.1"

            [[hosts]]
            name = "a"
            address = "10.0.0.2"
            "#,
        );
        assert!(load_from_path(file.path()).is_err());
    }
}
