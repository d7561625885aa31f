use anyhow::Result;
use jsonschema::{validator_for, Validator};
use once_cell::sync::{Lazy, OnceCell};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Environment variable naming a TOML config file read on first use.
pub const CONFIG_ENV: &str = "CONFORM_CONFIG";

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct DiagnosticsConfig {
    /// Emit a debug event for every resolved binding field (default off).
    #[serde(default)]
    pub trace_fields: Option<bool>,
    /// Warn when a member has the required name but another shape (default on).
    #[serde(default)]
    pub warn_on_mismatch: Option<bool>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

static CONFIG_SCHEMA: Lazy<Validator> = Lazy::new(|| {
    let schema = schemars::schema_for!(Config);
    let schema_value = serde_json::to_value(&schema).expect("schema value");
    validator_for(&schema_value).expect("valid schema")
});

static CURRENT: OnceCell<Config> = OnceCell::new();

/// Returns the JSON schema describing the configuration structure.
///
/// # Panics
///
/// Panics if schema generation fails; this indicates a programming error.
pub fn config_schema_json() -> serde_json::Value {
    let schema = schemars::schema_for!(Config);
    serde_json::to_value(&schema).expect("schema json")
}

pub fn load_config(path: &str) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let raw: toml::Value = toml::from_str(&content)?;
    let json_value = serde_json::to_value(&raw)?;
    let validation_errors: Vec<_> = CONFIG_SCHEMA
        .iter_errors(&json_value)
        .map(|e| e.to_string())
        .collect();
    if !validation_errors.is_empty() {
        return Err(anyhow::anyhow!(validation_errors.join(", ")));
    }
    let cfg: Config = toml::from_str(&content)?;
    Ok(cfg)
}

/// Install the process-wide config. Returns `false` if one is already in
/// place (installed earlier or loaded on first use).
pub fn install(cfg: Config) -> bool {
    CURRENT.set(cfg).is_ok()
}

/// The process-wide config: the installed one, else the file named by
/// `CONFORM_CONFIG`, else defaults.
pub fn current() -> &'static Config {
    CURRENT.get_or_init(|| match std::env::var(CONFIG_ENV) {
        Ok(path) => load_config(&path).unwrap_or_else(|err| {
            tracing::warn!(%path, %err, "failed to load conform config; using defaults");
            Config::default()
        }),
        Err(_) => Config::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_diagnostics_section() {
        let file = write_config("[diagnostics]\ntrace_fields = true\n");
        let cfg = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.diagnostics.trace_fields, Some(true));
        assert_eq!(cfg.diagnostics.warn_on_mismatch, None);
    }

    #[test]
    fn rejects_values_of_the_wrong_type() {
        let file = write_config("[diagnostics]\nwarn_on_mismatch = \"loud\"\n");
        let err = load_config(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("loud"), "{err}");
    }

    #[test]
    fn rejects_unknown_sections() {
        let file = write_config("[runtime]\nport = 8080\n");
        assert!(load_config(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    #[serial_test::serial]
    fn installed_config_wins_once() {
        let cfg = Config {
            diagnostics: DiagnosticsConfig {
                trace_fields: Some(true),
                warn_on_mismatch: Some(false),
            },
        };
        assert!(install(cfg.clone()));
        assert!(!install(Config::default()));
        assert_eq!(current(), &cfg);
    }

    #[test]
    fn schema_lists_diagnostics() {
        let schema = config_schema_json();
        assert!(schema["properties"]["diagnostics"].is_object());
    }
}
