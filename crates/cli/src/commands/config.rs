use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use shelfsense_core::config::{detect_config_path, AppConfig, LoadOptions};
use toml::Value;

/// One reported setting: dotted key, rendered value, and the env variable that
/// can override it.
struct Setting {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run(options: LoadOptions) -> String {
    let config_file_path = options.config_path.clone().or_else(detect_config_path);
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for setting in settings(&config) {
        let source =
            field_source(&setting, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(format!("- {} = {} (source: {source})", setting.key, setting.value));
    }
    lines.join("\n")
}

fn settings(config: &AppConfig) -> Vec<Setting> {
    let optional_path = |path: &Option<PathBuf>| {
        path.as_ref().map(|path| path.display().to_string()).unwrap_or_else(|| "<unset>".to_string())
    };

    vec![
        Setting {
            key: "database.url",
            value: config.database.url.clone(),
            env_keys: &["SHELFSENSE_DATABASE_URL"],
        },
        Setting {
            key: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["SHELFSENSE_DATABASE_MAX_CONNECTIONS"],
        },
        Setting {
            key: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["SHELFSENSE_DATABASE_TIMEOUT_SECS"],
        },
        Setting {
            key: "llm.provider",
            value: format!("{:?}", config.llm.provider),
            env_keys: &["SHELFSENSE_LLM_PROVIDER"],
        },
        Setting {
            key: "llm.model",
            value: config.llm.model.clone(),
            env_keys: &["SHELFSENSE_LLM_MODEL"],
        },
        Setting {
            key: "llm.base_url",
            value: config.llm.effective_base_url().to_string(),
            env_keys: &["SHELFSENSE_LLM_BASE_URL"],
        },
        Setting {
            key: "llm.api_key",
            value: (if config.llm.has_api_key() { "<redacted>" } else { "<unset>" }).to_string(),
            env_keys: &["SHELFSENSE_LLM_API_KEY", "GROQ_API_KEY"],
        },
        Setting {
            key: "llm.temperature",
            value: config.llm.temperature.to_string(),
            env_keys: &["SHELFSENSE_LLM_TEMPERATURE"],
        },
        Setting {
            key: "agent.max_steps",
            value: config.agent.max_steps.to_string(),
            env_keys: &["SHELFSENSE_AGENT_MAX_STEPS"],
        },
        Setting {
            key: "agent.turn_timeout_secs",
            value: config.agent.turn_timeout_secs.to_string(),
            env_keys: &["SHELFSENSE_AGENT_TURN_TIMEOUT_SECS"],
        },
        Setting {
            key: "agent.enforce_exclusions",
            value: config.agent.enforce_exclusions.to_string(),
            env_keys: &["SHELFSENSE_AGENT_ENFORCE_EXCLUSIONS"],
        },
        Setting {
            key: "forecast.model_path",
            value: optional_path(&config.forecast.model_path),
            env_keys: &["SHELFSENSE_FORECAST_MODEL_PATH"],
        },
        Setting {
            key: "forecast.model_dir",
            value: optional_path(&config.forecast.model_dir),
            env_keys: &["SHELFSENSE_FORECAST_MODEL_DIR"],
        },
        Setting {
            key: "forecast.history_cutoff",
            value: config
                .forecast
                .history_cutoff
                .map(|date| date.to_string())
                .unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["SHELFSENSE_FORECAST_HISTORY_CUTOFF"],
        },
        Setting {
            key: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["SHELFSENSE_SERVER_BIND_ADDRESS"],
        },
        Setting {
            key: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["SHELFSENSE_SERVER_PORT"],
        },
        Setting {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["SHELFSENSE_LOGGING_LEVEL", "SHELFSENSE_LOG_LEVEL"],
        },
        Setting {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["SHELFSENSE_LOGGING_FORMAT", "SHELFSENSE_LOG_FORMAT"],
        },
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    toml::from_str::<Value>(&raw).ok()
}

fn field_source(
    setting: &Setting,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = setting.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if config_file_doc.is_some_and(|doc| contains_path(doc, setting.key)) {
        let file_path = config_file_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    key_path.split('.').try_fold(root, |current, key| current.get(key)).is_some()
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::contains_path;

    #[test]
    fn dotted_paths_resolve_through_nested_tables() {
        let doc = toml::from_str::<Value>("[llm]\nmodel = \"llama3\"\n").expect("toml");
        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.api_key"));
        assert!(!contains_path(&doc, "database.url"));
    }
}
