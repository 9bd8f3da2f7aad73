use std::env;
use std::fs;
use std::path::Path;

use offerdesk_core::config::{resolve_config_path, AppConfig, LoadOptions};
use offerdesk_core::errors::ApplicationError;
use serde::Serialize;
use toml::Value;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::from_error(
                "config",
                "config_validation",
                ApplicationError::Configuration(error.to_string()),
                2,
            );
        }
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };
    let flagged = |flag: &str, set: bool, fallback: String| {
        if set {
            format!("flag ({flag})")
        } else {
            fallback
        }
    };
    let overrides = &options.overrides;

    let entries = vec![
        ConfigEntry {
            key: "logging.level",
            value: config.logging.level.clone(),
            source: flagged(
                "--log-level",
                overrides.log_level.is_some(),
                source("logging.level", &["OFFERDESK_LOGGING_LEVEL", "OFFERDESK_LOG_LEVEL"]),
            ),
        },
        ConfigEntry {
            key: "logging.format",
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
            source: flagged(
                "--log-format",
                overrides.log_format.is_some(),
                source("logging.format", &["OFFERDESK_LOGGING_FORMAT", "OFFERDESK_LOG_FORMAT"]),
            ),
        },
        ConfigEntry {
            key: "pricing.scale",
            value: config.pricing.scale.to_string(),
            source: source("pricing.scale", &["OFFERDESK_PRICING_SCALE"]),
        },
        ConfigEntry {
            key: "submission.require_discount",
            value: config.submission.require_discount.to_string(),
            source: flagged(
                "--require-discount",
                overrides.require_discount.is_some(),
                source("submission.require_discount", &["OFFERDESK_SUBMISSION_REQUIRE_DISCOUNT"]),
            ),
        },
        ConfigEntry {
            key: "preview.max_image_bytes",
            value: config.preview.max_image_bytes.to_string(),
            source: source("preview.max_image_bytes", &["OFFERDESK_PREVIEW_MAX_IMAGE_BYTES"]),
        },
        ConfigEntry {
            key: "render.template_dir",
            value: config
                .render
                .template_dir
                .as_ref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_else(|| "<embedded>".to_string()),
            source: flagged(
                "--template-dir",
                overrides.template_dir.is_some(),
                source("render.template_dir", &["OFFERDESK_RENDER_TEMPLATE_DIR"]),
            ),
        },
    ];

    let mut lines = vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    lines.extend(entries.iter().map(render_line));

    CommandResult::success_with_details("config", lines.join("\n"), entries)
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(entry: &ConfigEntry) -> String {
    format!("- {} = {} (source: {})", entry.key, entry.value, entry.source)
}
