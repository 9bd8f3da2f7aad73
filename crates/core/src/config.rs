use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::preview::DEFAULT_MAX_IMAGE_BYTES;
use crate::pricing::{DEFAULT_PRICE_SCALE, MAX_PRICE_SCALE};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub pricing: PricingConfig,
    pub submission: SubmissionConfig,
    pub preview: PreviewConfig,
    pub render: RenderConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingConfig {
    pub scale: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionConfig {
    /// The form marks discount percent as required, the gate does not enforce it
    /// unless this is set.
    pub require_discount: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewConfig {
    pub max_image_bytes: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    pub template_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub require_discount: Option<bool>,
    pub template_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            pricing: PricingConfig { scale: DEFAULT_PRICE_SCALE },
            submission: SubmissionConfig { require_discount: false },
            preview: PreviewConfig { max_image_bytes: DEFAULT_MAX_IMAGE_BYTES },
            render: RenderConfig { template_dir: None },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("offerdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(scale) = patch.pricing.and_then(|pricing| pricing.scale) {
            self.pricing.scale = scale;
        }

        if let Some(require_discount) =
            patch.submission.and_then(|submission| submission.require_discount)
        {
            self.submission.require_discount = require_discount;
        }

        if let Some(max_image_bytes) = patch.preview.and_then(|preview| preview.max_image_bytes) {
            self.preview.max_image_bytes = max_image_bytes;
        }

        if let Some(template_dir) = patch.render.and_then(|render| render.template_dir) {
            self.render.template_dir = Some(template_dir);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let log_level =
            read_env("OFFERDESK_LOGGING_LEVEL").or_else(|| read_env("OFFERDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("OFFERDESK_LOGGING_FORMAT").or_else(|| read_env("OFFERDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("OFFERDESK_PRICING_SCALE") {
            self.pricing.scale = parse_u32("OFFERDESK_PRICING_SCALE", &value)?;
        }
        if let Some(value) = read_env("OFFERDESK_SUBMISSION_REQUIRE_DISCOUNT") {
            self.submission.require_discount =
                parse_bool("OFFERDESK_SUBMISSION_REQUIRE_DISCOUNT", &value)?;
        }
        if let Some(value) = read_env("OFFERDESK_PREVIEW_MAX_IMAGE_BYTES") {
            self.preview.max_image_bytes = parse_u64("OFFERDESK_PREVIEW_MAX_IMAGE_BYTES", &value)?;
        }
        if let Some(value) = read_env("OFFERDESK_RENDER_TEMPLATE_DIR") {
            self.render.template_dir = Some(PathBuf::from(value));
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(require_discount) = overrides.require_discount {
            self.submission.require_discount = require_discount;
        }
        if let Some(template_dir) = overrides.template_dir {
            self.render.template_dir = Some(template_dir);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_logging(&self.logging)?;
        validate_pricing(&self.pricing)?;
        validate_preview(&self.preview)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("offerdesk.toml"), PathBuf::from("config/offerdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if pricing.scale > MAX_PRICE_SCALE {
        return Err(ConfigError::Validation(format!(
            "pricing.scale must be in range 0..={MAX_PRICE_SCALE}"
        )));
    }
    Ok(())
}

fn validate_preview(preview: &PreviewConfig) -> Result<(), ConfigError> {
    if preview.max_image_bytes == 0 {
        return Err(ConfigError::Validation(
            "preview.max_image_bytes must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    logging: Option<LoggingPatch>,
    pricing: Option<PricingPatch>,
    submission: Option<SubmissionPatch>,
    preview: Option<PreviewPatch>,
    render: Option<RenderPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    scale: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SubmissionPatch {
    require_discount: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct PreviewPatch {
    max_image_bytes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderPatch {
    template_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_storefront_behaviour() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;
        ensure(config.pricing.scale == 2, "prices default to two decimals")?;
        ensure(!config.submission.require_discount, "discount is optional by default")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )?;
        ensure(config.render.template_dir.is_none(), "embedded templates by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_OFFERDESK_TEMPLATES", "/srv/offerdesk/templates");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("offerdesk.toml");
            fs::write(
                &path,
                r#"
[render]
template_dir = "${TEST_OFFERDESK_TEMPLATES}"

[submission]
require_discount = true
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.render.template_dir == Some(PathBuf::from("/srv/offerdesk/templates")),
                "template dir should be interpolated from environment",
            )?;
            ensure(config.submission.require_discount, "file should enable require_discount")?;
            Ok(())
        })();

        clear_vars(&["TEST_OFFERDESK_TEMPLATES"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OFFERDESK_LOG_LEVEL", "warn");
        env::set_var("OFFERDESK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["OFFERDESK_LOG_LEVEL", "OFFERDESK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OFFERDESK_PRICING_SCALE", "3");
        env::set_var("OFFERDESK_SUBMISSION_REQUIRE_DISCOUNT", "true");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("offerdesk.toml");
            fs::write(
                &path,
                r#"
[pricing]
scale = 1

[preview]
max_image_bytes = 2048

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    require_discount: Some(false),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.pricing.scale == 3, "env scale should win over file")?;
            ensure(config.preview.max_image_bytes == 2048, "file value should beat default")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(!config.submission.require_discount, "explicit override should beat env")?;
            Ok(())
        })();

        clear_vars(&["OFFERDESK_PRICING_SCALE", "OFFERDESK_SUBMISSION_REQUIRE_DISCOUNT"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OFFERDESK_PRICING_SCALE", "9");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("pricing.scale")
            );
            ensure(has_message, "validation failure should mention pricing.scale")
        })();

        clear_vars(&["OFFERDESK_PRICING_SCALE"]);
        result
    }

    #[test]
    fn malformed_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("OFFERDESK_SUBMISSION_REQUIRE_DISCOUNT", "sometimes");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                key == "OFFERDESK_SUBMISSION_REQUIRE_DISCOUNT",
                "error should name the offending variable",
            ),
            _ => Err("expected invalid env override error".to_string()),
        };

        clear_vars(&["OFFERDESK_SUBMISSION_REQUIRE_DISCOUNT"]);
        result
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/definitely/not/here/offerdesk.toml")),
            require_file: true,
            ..LoadOptions::default()
        });
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }
}
