//! Host application config: registers this server in the desktop client's
//! `mcpServers` table.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::types::{McpError, McpResult};

pub const HOST_CONFIG_FILE: &str = "claude_desktop_config.json";
pub const SERVER_KEY: &str = "quirkllm";
pub const BINARY_NAME: &str = "quirkllm-mcp";

/// Platform location of the host config file.
pub fn desktop_config_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let home = PathBuf::from(home);

    let dir = if cfg!(target_os = "macos") {
        home.join("Library").join("Application Support").join("Claude")
    } else if cfg!(target_os = "windows") {
        std::env::var("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join("AppData").join("Roaming"))
            .join("Claude")
    } else {
        home.join(".config").join("Claude")
    };

    dir.join(HOST_CONFIG_FILE)
}

/// Command the host should launch: this executable when it can be located.
pub fn server_command() -> String {
    std::env::current_exe()
        .ok()
        .filter(|p| p.exists())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| BINARY_NAME.to_string())
}

/// The `mcpServers` entry for this server.
pub fn generate_config(command: &str) -> Value {
    json!({
        "mcpServers": {
            SERVER_KEY: {
                "command": command,
                "args": ["serve"],
                "env": {}
            }
        }
    })
}

/// Existing host config. Missing or unreadable files count as empty.
pub fn load_existing(path: &Path) -> Map<String, Value> {
    let Ok(text) = std::fs::read_to_string(path) else {
        return Map::new();
    };
    match serde_json::from_str(&text) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            tracing::warn!("Ignoring unreadable host config at {}", path.display());
            Map::new()
        }
    }
}

/// Write the server entry into the host config. With `merge`, other entries
/// and top-level keys are preserved.
pub fn install_config(path: &Path, command: &str, merge: bool) -> McpResult<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            McpError::Io(std::io::Error::other(format!(
                "Failed to create directory {}: {e}",
                parent.display()
            )))
        })?;
    }

    let entry = generate_config(command)["mcpServers"][SERVER_KEY].clone();
    let mut config = if merge { load_existing(path) } else { Map::new() };

    let servers = config
        .entry("mcpServers")
        .or_insert_with(|| Value::Object(Map::new()));
    if !servers.is_object() {
        *servers = Value::Object(Map::new());
    }
    if let Value::Object(servers) = servers {
        servers.insert(SERVER_KEY.to_string(), entry);
    }

    write_config(path, &config)?;
    tracing::info!("Installed MCP config at {}", path.display());
    Ok(path.to_path_buf())
}

/// Remove the server entry. Returns false when there was nothing to remove.
pub fn uninstall_config(path: &Path) -> McpResult<bool> {
    if !path.exists() {
        return Ok(false);
    }

    let mut config = load_existing(path);
    let removed = config
        .get_mut("mcpServers")
        .and_then(Value::as_object_mut)
        .and_then(|servers| servers.remove(SERVER_KEY))
        .is_some();

    if removed {
        write_config(path, &config)?;
    }
    Ok(removed)
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallStatus {
    pub installed: bool,
    pub config_path: String,
    pub command: Option<String>,
    pub errors: Vec<String>,
}

/// Inspect the host config for a usable server entry.
pub fn check_installation(path: &Path) -> InstallStatus {
    let mut status = InstallStatus {
        installed: false,
        config_path: path.display().to_string(),
        command: None,
        errors: Vec::new(),
    };

    if !path.exists() {
        status.errors.push("Host config file not found".to_string());
        return status;
    }

    let config = load_existing(path);
    let Some(servers) = config.get("mcpServers").and_then(Value::as_object) else {
        status.errors.push("No MCP servers configured".to_string());
        return status;
    };
    let Some(entry) = servers.get(SERVER_KEY) else {
        status
            .errors
            .push(format!("{SERVER_KEY} not configured as MCP server"));
        return status;
    };

    let command = entry
        .get("command")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    status.command = Some(command.clone());

    let bare_name = !command.contains(std::path::MAIN_SEPARATOR) && !command.contains('/');
    if command.is_empty() || (!bare_name && !Path::new(&command).exists()) {
        status
            .errors
            .push(format!("Server executable not found at: {command}"));
        return status;
    }

    status.installed = true;
    status
}

fn write_config(path: &Path, config: &Map<String, Value>) -> McpResult<()> {
    let text = serde_json::to_string_pretty(config)?;
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_into_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Claude").join(HOST_CONFIG_FILE);

        install_config(&path, BINARY_NAME, true).unwrap();
        let written = load_existing(&path);
        assert_eq!(written["mcpServers"][SERVER_KEY]["command"], BINARY_NAME);
        assert_eq!(written["mcpServers"][SERVER_KEY]["args"], json!(["serve"]));

        let status = check_installation(&path);
        assert!(status.installed, "{:?}", status.errors);
    }

    #[test]
    fn merge_keeps_other_servers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HOST_CONFIG_FILE);
        std::fs::write(
            &path,
            r#"{"theme":"dark","mcpServers":{"other":{"command":"other-server"}}}"#,
        )
        .unwrap();

        install_config(&path, BINARY_NAME, true).unwrap();
        let written = load_existing(&path);
        assert_eq!(written["theme"], "dark");
        assert_eq!(written["mcpServers"]["other"]["command"], "other-server");
        assert!(written["mcpServers"].get(SERVER_KEY).is_some());
    }

    #[test]
    fn overwrite_drops_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HOST_CONFIG_FILE);
        std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        install_config(&path, BINARY_NAME, false).unwrap();
        let written = load_existing(&path);
        assert!(written.get("theme").is_none());
    }

    #[test]
    fn corrupt_config_is_replaced_on_install() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HOST_CONFIG_FILE);
        std::fs::write(&path, "{not json").unwrap();

        install_config(&path, BINARY_NAME, true).unwrap();
        assert!(load_existing(&path)["mcpServers"].get(SERVER_KEY).is_some());
    }

    #[test]
    fn uninstall_removes_only_our_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HOST_CONFIG_FILE);
        std::fs::write(&path, r#"{"mcpServers":{"other":{"command":"x"}}}"#).unwrap();
        install_config(&path, BINARY_NAME, true).unwrap();

        assert!(uninstall_config(&path).unwrap());
        assert!(!uninstall_config(&path).unwrap());
        let written = load_existing(&path);
        assert!(written["mcpServers"].get("other").is_some());
    }

    #[test]
    fn uninstall_without_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!uninstall_config(&dir.path().join(HOST_CONFIG_FILE)).unwrap());
    }

    #[test]
    fn status_reports_missing_pieces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HOST_CONFIG_FILE);
        assert!(!check_installation(&path).installed);

        std::fs::write(&path, r#"{"mcpServers":{}}"#).unwrap();
        let status = check_installation(&path);
        assert!(!status.installed);
        assert!(status.errors[0].contains("not configured"));

        let missing = dir.path().join("bin").join("quirkllm-mcp");
        install_config(&path, &missing.display().to_string(), true).unwrap();
        let status = check_installation(&path);
        assert!(!status.installed);
        assert!(status.errors[0].contains("not found"));
    }
}
