//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/nodecomp/nodecomp.toml`
//! 3. Explicit config file (`--config-file <path>`)
//! 4. Environment variables: `NODECOMP_*` prefix, `__` between sections

use std::path::{Path, PathBuf};

use ::config::{Config, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::HookPolicy;
use crate::errors::{SettingsError, SettingsResult};
use crate::tree_traits::RenderOptions;

pub const ENV_PREFIX: &str = "NODECOMP";

/// Lifecycle hook settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HookSettings {
    /// Fire detach hooks when a child is separated (default: true)
    pub notify_on_separate: bool,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            notify_on_separate: true,
        }
    }
}

/// Tree rendering settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplaySettings {
    /// Show fully qualified type names next to node labels
    pub full_type_names: bool,
}

/// Unified configuration for nodecomp.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub hooks: HookSettings,
    pub display: DisplaySettings,
}

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub hooks: RawHookSettings,
    pub display: RawDisplaySettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawHookSettings {
    pub notify_on_separate: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawDisplaySettings {
    pub full_type_names: Option<bool>,
}

/// Get the XDG config directory for nodecomp.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "nodecomp").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("nodecomp.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> SettingsResult<RawSettings> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Settings {
    /// Hook policy for nodes built from these settings.
    pub fn hook_policy(&self) -> HookPolicy {
        HookPolicy {
            notify_on_separate: self.hooks.notify_on_separate,
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            full_type_names: self.display.full_type_names,
        }
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            hooks: HookSettings {
                notify_on_separate: overlay
                    .hooks
                    .notify_on_separate
                    .unwrap_or(self.hooks.notify_on_separate),
            },
            display: DisplaySettings {
                full_type_names: overlay
                    .display
                    .full_type_names
                    .unwrap_or(self.display.full_type_names),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `explicit` - Optional config file given on the command line
    ///
    /// A missing global file is skipped; a missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> SettingsResult<Self> {
        let global = global_config_path().filter(|path| path.exists());
        Self::load_from(
            global.as_deref(),
            explicit,
            Environment::with_prefix(ENV_PREFIX),
        )
    }

    /// Load from the given layers; `env` is the environment source to apply last.
    #[instrument(level = "debug", skip(env))]
    pub fn load_from(
        global: Option<&Path>,
        explicit: Option<&Path>,
        env: Environment,
    ) -> SettingsResult<Self> {
        let mut current = Self::default();

        for path in [global, explicit].into_iter().flatten() {
            debug!(path = %path.display(), "merging config file");
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        Self::apply_env_overrides(current, env)
    }

    /// Apply environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self, env: Environment) -> SettingsResult<Self> {
        let config = Config::builder()
            .add_source(env.prefix_separator("_").separator("__"))
            .build()?;

        if let Ok(val) = config.get_bool("hooks.notify_on_separate") {
            settings.hooks.notify_on_separate = val;
        }
        if let Ok(val) = config.get_bool("display.full_type_names") {
            settings.display.full_type_names = val;
        }

        Ok(settings)
    }

    /// Render as TOML, e.g. for `config show`.
    pub fn to_toml(&self) -> SettingsResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_then_separate_notifies_and_short_names() {
        let settings = Settings::default();
        assert!(settings.hooks.notify_on_separate);
        assert!(!settings.display.full_type_names);
        assert_eq!(settings.hook_policy(), HookPolicy::default());
    }

    #[test]
    fn given_partial_overlay_when_merge_then_unspecified_fields_kept() {
        let raw: RawSettings = toml::from_str("[display]\nfull_type_names = true\n").unwrap();
        let merged = Settings::default().merge_with(&raw);
        assert!(merged.display.full_type_names);
        assert!(merged.hooks.notify_on_separate);
    }

    #[test]
    fn given_settings_when_to_toml_then_round_trips() {
        let mut settings = Settings::default();
        settings.hooks.notify_on_separate = false;
        let rendered = settings.to_toml().unwrap();
        assert!(rendered.contains("notify_on_separate = false"));
        let parsed: Settings = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, settings);
    }
}
