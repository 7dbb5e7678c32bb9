//! Configuration system for clush.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/clush/config.toml` and/or `.clush/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::skill::SkillLevel;

/// Top-level configuration for the shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Privilege tier of the operator; commands above it are refused.
    #[serde(default)]
    pub skill_level: SkillLevel,
    /// Make every command wait for its completion signal.
    #[serde(default)]
    pub wait: bool,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            skill_level: SkillLevel::Operator,
            wait: false,
            ui: UiConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl ShellConfig {
    /// Reject values the shell cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ui.columns == 0 {
            return Err(ConfigError::Invalid {
                message: "ui.columns must be at least 1".into(),
            });
        }
        if self.ui.column_width == 0 {
            return Err(ConfigError::Invalid {
                message: "ui.column_width must be at least 1".into(),
            });
        }
        if self.ui.prompt.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "ui.prompt must not be empty".into(),
            });
        }
        Ok(())
    }
}

/// Terminal presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Width of one `ls` cell.
    #[serde(default = "default_column_width")]
    pub column_width: usize,
    /// Cells per `ls` row.
    #[serde(default = "default_columns")]
    pub columns: usize,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_true")]
    pub color: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            column_width: default_column_width(),
            columns: default_columns(),
            prompt: default_prompt(),
            color: true,
        }
    }
}

/// Session state kept between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Save the level stack after every transition and restore it at startup.
    #[serde(default = "default_true")]
    pub persist_stack: bool,
    /// Where the stack is saved. Defaults to `stack.json` in the data directory.
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persist_stack: true,
            state_file: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_column_width() -> usize {
    16
}

fn default_columns() -> usize {
    3
}

fn default_prompt() -> String {
    "clush".into()
}

/// Load configuration from all sources, merging in priority order.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `CLUSH_`)
/// 3. Workspace-local config (`.clush/config.toml`)
/// 4. User config (`~/.config/clush/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&ShellConfig>,
) -> Result<ShellConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(ShellConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "clush", "clush") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".clush").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (CLUSH_SKILL_LEVEL, CLUSH_UI__COLUMNS, etc.)
    figment = figment.merge(Env::prefixed("CLUSH_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Check whether any clush configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "clush", "clush") {
        if config_dir.config_dir().join("config.toml").exists() {
            return true;
        }
    }

    if let Some(ws) = workspace {
        if ws.join(".clush").join("config.toml").exists() {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShellConfig::default();
        assert_eq!(config.skill_level, SkillLevel::Operator);
        assert!(!config.wait);
        assert_eq!(config.ui.column_width, 16);
        assert_eq!(config.ui.columns, 3);
        assert_eq!(config.ui.prompt, "clush");
        assert!(config.session.persist_stack);
        assert!(config.session.state_file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = ShellConfig::default();
        config.skill_level = SkillLevel::Expert;
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("skill_level = \"expert\""));
        let deserialized: ShellConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.skill_level, SkillLevel::Expert);
        assert_eq!(deserialized.ui.columns, config.ui.columns);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ShellConfig = toml::from_str("skill_level = 1\n[ui]\ncolumns = 4\n").unwrap();
        assert_eq!(config.skill_level, SkillLevel::Administrator);
        assert_eq!(config.ui.columns, 4);
        assert_eq!(config.ui.column_width, 16);
        assert!(config.session.persist_stack);
    }

    #[test]
    fn test_load_config_with_overrides() {
        let mut overrides = ShellConfig::default();
        overrides.wait = true;
        overrides.ui.prompt = "crm".into();

        let config = load_config(None, Some(&overrides)).unwrap();
        assert!(config.wait);
        assert_eq!(config.ui.prompt, "crm");
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let clush_dir = dir.path().join(".clush");
        std::fs::create_dir_all(&clush_dir).unwrap();
        std::fs::write(
            clush_dir.join("config.toml"),
            r#"
skill_level = "administrator"

[ui]
column_width = 20
columns = 4

[session]
persist_stack = false
"#,
        )
        .unwrap();

        assert!(config_exists(Some(dir.path())));
        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.skill_level, SkillLevel::Administrator);
        assert_eq!(config.ui.column_width, 20);
        assert_eq!(config.ui.columns, 4);
        assert!(!config.session.persist_stack);
    }

    #[test]
    fn test_invalid_skill_level_in_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let clush_dir = dir.path().join(".clush");
        std::fs::create_dir_all(&clush_dir).unwrap();
        std::fs::write(clush_dir.join("config.toml"), "skill_level = \"wizard\"\n").unwrap();
        assert!(load_config(Some(dir.path()), None).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_columns() {
        let mut config = ShellConfig::default();
        config.ui.columns = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }
}
