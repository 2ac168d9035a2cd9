// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use indicatif::MultiProgress;
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use srt_translator::app_config::{Config, LogLevel, Profile, ProfileStore, DEFAULT_PROFILE};
use srt_translator::app_controller::Controller;
use srt_translator::subtitle_processor::LineEnding;
use srt_translator::translation::TranslationStyle;

/// CLI Wrapper for TranslationStyle to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliStyle {
    Natural,
    Formal,
    Simple,
}

impl From<CliStyle> for TranslationStyle {
    fn from(style: CliStyle) -> Self {
        match style {
            CliStyle::Natural => TranslationStyle::Natural,
            CliStyle::Formal => TranslationStyle::Formal,
            CliStyle::Simple => TranslationStyle::Simple,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate subtitle files or folders (default command)
    Translate(TranslateArgs),

    /// List the models installed on the Ollama server
    Models,

    /// Manage saved profiles
    Profiles {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Generate shell completions for srt-translator
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// List profile names
    List,

    /// Show the settings stored in a profile
    Show { name: String },

    /// Save the effective settings (config, flags) under a name
    Save {
        name: String,
        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Rename a profile
    Rename { from: String, to: String },

    /// Delete a profile
    Delete { name: String },
}

/// Options that apply to every command
#[derive(Args, Debug, Clone)]
struct GlobalArgs {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config_path: PathBuf,

    /// Profile store path (defaults to the user config directory)
    #[arg(long, global = true, env = "SRT_TRANSLATOR_PROFILES")]
    profiles_path: Option<PathBuf>,

    /// Ollama endpoint, e.g. http://localhost:11434
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// Translation settings that profiles can also carry
#[derive(Args, Debug, Clone, Default)]
struct SettingsArgs {
    /// Start from a saved profile
    #[arg(short, long)]
    profile: Option<String>,

    /// Target language code (e.g., 'sv', 'de', 'zh-CN')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Translation style
    #[arg(short, long, value_enum)]
    style: Option<CliStyle>,

    /// Custom system prompt; `{target_language}` is substituted
    #[arg(long)]
    prompt: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
struct TranslateArgs {
    /// Subtitle files or directories to translate
    #[arg(value_name = "INPUT_PATH")]
    inputs: Vec<PathBuf>,

    #[command(flatten)]
    settings: SettingsArgs,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Number of files translated at the same time
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Write CRLF line endings
    #[arg(long)]
    crlf: bool,
}

/// srt-translator - translate SRT subtitles with a local LLM
///
/// Sends every subtitle block to an Ollama server and writes the translation
/// next to the source file, keeping timing and inline formatting.
#[derive(Parser, Debug)]
#[command(name = "srt-translator")]
#[command(version)]
#[command(about = "Translate SRT subtitles with a local LLM")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "srt-translator sends SRT subtitles to an Ollama server and writes the translations next to the originals.

EXAMPLES:
    srt-translator movie.en.srt                    # Translate using default config
    srt-translator -t sv movie.en.srt              # Translate into Swedish (writes movie.sv.srt)
    srt-translator -f -t de -s formal /subs/       # Whole folder, formal tone, overwrite existing files
    srt-translator -m qwen2.5:7b -j 3 /subs/       # Specific model, three files at a time
    srt-translator -p Anime episode01.srt          # Use a saved profile
    srt-translator models                          # List installed models
    srt-translator profiles save Anime -t ja -s natural
    srt-translator completions bash > srt-translator.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. Profiles live in profiles.json in the user
    config directory.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: GlobalArgs,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
    progress: MultiProgress,
}

impl CustomLogger {
    // @initializes: Global logger; lines are printed above any progress bars
    fn init(level: LevelFilter, progress: MultiProgress) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level, progress }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Tag and ANSI colour for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "\x1B[1;31m"),
            Level::Warn => ("WARN ", "\x1B[1;33m"),
            Level::Info => ("INFO ", "\x1B[1;32m"),
            Level::Debug => ("DEBUG", "\x1B[1;36m"),
            Level::Trace => ("TRACE", "\x1B[1;35m"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (tag, colour) = Self::style_for_level(record.level());
            self.progress.suspend(|| {
                let _ = writeln!(std::io::stderr(), "{}{} {} {}\x1B[0m", colour, now, tag, record.args());
            });
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn profiles_path(global: &GlobalArgs) -> Result<PathBuf> {
    match &global.profiles_path {
        Some(path) => Ok(path.clone()),
        None => ProfileStore::default_path(),
    }
}

/// Load the config file and layer profile, then flags, on top
fn effective_config(global: &GlobalArgs, settings: &SettingsArgs) -> Result<Config> {
    let mut config = Config::load_or_create(&global.config_path)?;

    if let Some(name) = &settings.profile {
        let store = ProfileStore::load(profiles_path(global)?);
        store.apply(name, &mut config)?;
    }
    if let Some(target_language) = &settings.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(model) = &settings.model {
        config.model = model.clone();
    }
    if let Some(style) = settings.style {
        config.style = style.into();
    }
    if let Some(prompt) = &settings.prompt {
        config.system_prompt_override = Some(prompt.clone());
    }
    if let Some(endpoint) = &global.endpoint {
        config.endpoint = endpoint.clone();
    }
    match global.log_level {
        Some(level) => config.log_level = level.into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let multi_progress = MultiProgress::new();

    // Initialize the logger once with trace level; the max level filters below it
    CustomLogger::init(LevelFilter::Trace, multi_progress.clone())?;
    log::set_max_level(LevelFilter::Info);

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();
    if let Some(level) = cli.global.log_level {
        log::set_max_level(LogLevel::from(level).to_level_filter());
    }

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "srt-translator", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(&cli.global, args, &multi_progress).await,
        Some(Commands::Models) => run_models(&cli.global).await,
        Some(Commands::Profiles { action }) => run_profiles(&cli.global, action),
        None => run_translate(&cli.global, cli.translate, &multi_progress).await,
    }
}

async fn run_translate(global: &GlobalArgs, args: TranslateArgs, multi_progress: &MultiProgress) -> Result<()> {
    if args.inputs.is_empty() {
        return Err(anyhow!("INPUT_PATH is required when no subcommand is specified"));
    }

    let mut config = effective_config(global, &args.settings)?;
    if args.force_overwrite {
        config.force_overwrite = true;
    }
    if let Some(jobs) = args.jobs {
        config.concurrent_jobs = jobs;
    }
    if args.crlf {
        config.line_ending = LineEnding::Crlf;
    }

    let controller = Controller::with_config(config).context("Configuration validation failed")?;

    let cancel = controller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current block (partial translations are kept)");
            cancel.cancel();
        }
    });

    let results = controller.run(&args.inputs, multi_progress).await?;
    let report = controller.report(&results);

    if report.has_failures() {
        return Err(anyhow!("{} of {} file(s) failed", report.failed, results.len()));
    }
    Ok(())
}

async fn run_models(global: &GlobalArgs) -> Result<()> {
    let config = effective_config(global, &SettingsArgs::default())?;
    let controller = Controller::with_config(config)?;

    let models = controller.list_models().await?;
    if models.is_empty() {
        warn!("No models installed on {}", controller.config().endpoint);
    }
    for model in models {
        match model.size {
            Some(size) => println!("{}\t{:.1} GB", model.name, size as f64 / 1_000_000_000.0),
            None => println!("{}", model.name),
        }
    }
    Ok(())
}

fn run_profiles(global: &GlobalArgs, action: ProfileAction) -> Result<()> {
    let path = profiles_path(global)?;
    let mut store = ProfileStore::load(&path);

    match action {
        ProfileAction::List => {
            for name in store.names() {
                println!("{}", name);
            }
            return Ok(());
        }
        ProfileAction::Show { name } => {
            let profile = store.get(&name).ok_or_else(|| anyhow!("No profile named '{}'", name))?;
            println!("{}", serde_json::to_string_pretty(profile)?);
            return Ok(());
        }
        ProfileAction::Save { name, settings } => {
            let config = effective_config(global, &settings)?;
            config.validate().context("Configuration validation failed")?;
            store.upsert(&name, Profile::from_config(&config))?;
            info!("Profile saved: {}", name);
        }
        ProfileAction::Rename { from, to } => {
            store.rename(&from, &to)?;
            info!("Renamed profile to: {}", to);
        }
        ProfileAction::Delete { name } => {
            store.delete(&name)?;
            info!("Deleted profile: {} (falling back to {})", name, DEFAULT_PROFILE);
        }
    }

    store.save(&path)
}
