pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use offerdesk_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "offerdesk",
    about = "Offerdesk operator CLI",
    long_about = "Drive the offer entry manager headlessly: derive offer prices, replay scripted editing sessions, and inspect configuration.",
    after_help = "Examples:\n  offerdesk price --original 1000 --discount 20\n  offerdesk replay session.json --html page.html\n  offerdesk --require-discount config"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Flags that override file and environment configuration.
#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    #[arg(long, global = true, help = "Config file to load instead of offerdesk.toml")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Log level (trace|debug|info|warn|error)")]
    pub log_level: Option<String>,
    #[arg(long, global = true, help = "Log format (compact|pretty|json)")]
    pub log_format: Option<LogFormat>,
    #[arg(long, global = true, help = "Require a discount percent before an offer is accepted")]
    pub require_discount: bool,
    #[arg(long, global = true, help = "Directory with offers/*.html.tera overrides")]
    pub template_dir: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config.clone(),
            overrides: ConfigOverrides {
                log_level: self.log_level.clone(),
                log_format: self.log_format,
                require_discount: self.require_discount.then_some(true),
                template_dir: self.template_dir.clone(),
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Derive the offer price for an original price and discount percent")]
    Price {
        #[arg(long, help = "Original price, e.g. 999.99")]
        original: String,
        #[arg(long, default_value = "0", help = "Discount percent, e.g. 10")]
        discount: String,
    },
    #[command(about = "Replay a JSON action script through an offer entry manager")]
    Replay {
        #[arg(help = "Path to the replay script")]
        script: PathBuf,
        #[arg(long, help = "Write the rendered admin page to this file")]
        html: Option<PathBuf>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.global.load_options();

    // Config errors are reported by the command itself; logging falls back to defaults.
    let config = AppConfig::load(options.clone()).unwrap_or_default();
    init_logging(&config);

    let result = match cli.command {
        Command::Price { original, discount } => {
            commands::price::run(&options, &original, &discount)
        }
        Command::Replay { script, html } => {
            commands::replay::run(&options, &script, html.as_deref())
        }
        Command::Config => commands::config::run(&options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout carries only the command payload.
pub fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if installed.is_err() {
        tracing::debug!(event_name = "system.logging.already_initialized", "subscriber already set");
    }
}
