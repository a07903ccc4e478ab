//! `lad init`: write the example configuration.

use crate::ui;
use lad_types::config::{default_config_path, EXAMPLE_CONFIG};
use std::path::{Path, PathBuf};

pub fn cmd_init(path: Option<PathBuf>, force: bool) -> i32 {
    let path = path.unwrap_or_else(default_config_path);
    match write_example_config(&path, force) {
        Ok(()) => {
            ui::success(&format!("Wrote {}", path.display()));
            ui::hint("Edit the [server] section, then run `lad serve`");
            0
        }
        Err(InitError::Exists) => {
            ui::error_with_fix(
                &format!("{} already exists", path.display()),
                "Pass --force to overwrite it",
            );
            1
        }
        Err(InitError::Io(e)) => {
            ui::error(&format!("Failed to write {}: {e}", path.display()));
            1
        }
    }
}

#[derive(Debug)]
pub(crate) enum InitError {
    Exists,
    Io(std::io::Error),
}

impl From<std::io::Error> for InitError {
    fn from(e: std::io::Error) -> Self {
        InitError::Io(e)
    }
}

pub(crate) fn write_example_config(path: &Path, force: bool) -> Result<(), InitError> {
    if path.exists() && !force {
        return Err(InitError::Exists);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, EXAMPLE_CONFIG)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lad_types::config::{load_client_config, load_server_config};

    #[test]
    fn test_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        write_example_config(&path, false).unwrap();

        let server = load_server_config(Some(&path));
        assert_eq!(server.name, "Hotel Concierge");
        assert_eq!(server.capabilities, vec!["info", "dining", "spa"]);
        let client = load_client_config(Some(&path));
        assert_eq!(client.mdns_timeout_secs, 3.0);
    }

    #[test]
    fn test_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# mine").unwrap();
        assert!(matches!(
            write_example_config(&path, false),
            Err(InitError::Exists)
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");

        write_example_config(&path, true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[server]"));
    }
}
