// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, Context};
use log::{info, warn, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use ass_font_replacer::app_config::{ConfigStore, DEFAULT_CONFIG_FILE};
use ass_font_replacer::app_controller::Controller;
use ass_font_replacer::errors::BatchError;

/// CLI log level, mapped onto `log::LevelFilter`
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// On/off switch for `config spacing`
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rewrite the fonts of every .ass file in a directory (default command)
    Run(RunArgs),

    /// Show or edit the font mapping configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions for ass-font-replacer
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the current font mapping
    Show,

    /// Add a font mapping, or change the replacement of an existing one
    Set {
        /// Font name as it appears in subtitle files ("Default" sets the fallback)
        font_before: String,
        /// Replacement font name
        font_after: String,
    },

    /// Remove a font mapping
    Remove {
        /// Font name to stop mapping
        font_before: String,
    },

    /// Enable or disable removal of \fsp spacing overrides
    Spacing {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Restore the default configuration (Default -> Arial, spacing removal on)
    Reset,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Directory containing .ass subtitle files
    #[arg(value_name = "INPUT_DIR")]
    input_dir: PathBuf,

    /// Also process subtitles in nested directories
    #[arg(short, long)]
    recursive: bool,

    /// Output directory (default: output_<YYYYMMDD_HHMMSS>)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

/// ASS Font Replacer
///
/// Rewrites font names in Advanced SubStation Alpha subtitles according to a
/// configurable mapping.
#[derive(Parser, Debug)]
#[command(name = "ass-font-replacer")]
#[command(version)]
#[command(about = "Batch font replacement for ASS subtitle files")]
#[command(long_about = "ass-font-replacer rewrites the fonts used by .ass subtitle files.

Style definitions and inline \\fn overrides are remapped using the font mapping
from the configuration file; fonts without a mapping get the \"Default\" entry.
\\fsp spacing overrides can be stripped as well. Rewritten files are written
into a separate output directory, the inputs are never modified.

EXAMPLES:
    ass-font-replacer subs/                          # Rewrite subs/*.ass into output_<timestamp>/
    ass-font-replacer run -r subs/ -o fixed/         # Recurse into subs/, write into fixed/
    ass-font-replacer config set \"Comic Sans MS\" Arial
    ass-font-replacer config set Default Verdana     # Change the fallback font
    ass-font-replacer config spacing off             # Keep \\fsp overrides
    ass-font-replacer completions bash > asfr.bash   # Generate bash completions

CONFIGURATION:
    The font mapping is stored in fonts_config.json by default. You can specify a
    different file with --config-path. If the file doesn't exist, a default one
    will be created automatically. A corrupt file is kept as *_backup.json.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory containing .ass subtitle files
    #[arg(value_name = "INPUT_DIR")]
    input_dir: Option<PathBuf>,

    /// Also process subtitles in nested directories
    #[arg(short, long)]
    recursive: bool,

    /// Output directory (default: output_<YYYYMMDD_HHMMSS>)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: (ANSI color, emoji) for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "❌ "),
            Level::Warn => ("\x1B[1;33m", "🚧 "),
            Level::Info => ("\x1B[1;32m", " "),
            Level::Debug => ("\x1B[1;36m", "🔍 "),
            Level::Trace => ("\x1B[1;35m", "📋 "),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, emoji) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    let level = cli.log_level.clone().map(LevelFilter::from).unwrap_or(LevelFilter::Info);
    CustomLogger::init(level)?;

    let store = ConfigStore::new(cli.config_path.clone());

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "ass-font-replacer", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config(command)) => {
            run_config(&store, command)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Run(args)) => run_batch(&store, args).await,
        None => {
            // Default behavior - a bare INPUT_DIR runs a batch
            let Some(input_dir) = cli.input_dir else {
                CommandLineOptions::command().print_help()?;
                return Ok(ExitCode::from(2));
            };

            let args = RunArgs {
                input_dir,
                recursive: cli.recursive,
                output_dir: cli.output_dir,
            };
            run_batch(&store, args).await
        }
    }
}

async fn run_batch(store: &ConfigStore, args: RunArgs) -> Result<ExitCode> {
    // The batch works on this snapshot; later edits to the file don't affect it
    let config = store.load()
        .with_context(|| format!("Failed to load config file: {:?}", store.path()))?;

    let controller = Controller::with_config(config)?;

    match controller.run(args.input_dir, args.recursive, args.output_dir).await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => match e.downcast_ref::<BatchError>() {
            Some(BatchError::NoInputSelected { path }) => {
                warn!("No files selected for processing: no .ass files found in {:?}", path);
                Ok(ExitCode::from(2))
            }
            _ => Err(e),
        },
    }
}

fn run_config(store: &ConfigStore, command: ConfigCommand) -> Result<()> {
    let mut config = store.load()
        .with_context(|| format!("Failed to load config file: {:?}", store.path()))?;

    match command {
        ConfigCommand::Show => {
            println!("Config file: {}", store.path().display());
            println!("Remove font spacing: {}", config.remove_font_spacing);
            let width = config.fonts.iter().map(|e| e.font_before.chars().count()).max().unwrap_or(0);
            for entry in config.fonts.iter() {
                println!("  {:<width$}  ->  {}", entry.font_before, entry.font_after, width = width);
            }
            return Ok(());
        }
        ConfigCommand::Set { font_before, font_after } => {
            match config.fonts.insert(font_before.clone(), font_after.clone()) {
                Some(previous) => info!("Changed mapping {}: {} -> {}", font_before, previous, font_after),
                None => info!("Added mapping {} -> {}", font_before, font_after),
            }
        }
        ConfigCommand::Remove { font_before } => {
            if !config.fonts.remove(&font_before) {
                warn!("No mapping for '{}' in {:?}", font_before, store.path());
                return Ok(());
            }
            info!("Removed mapping for {}", font_before);
        }
        ConfigCommand::Spacing { state } => {
            config.remove_font_spacing = matches!(state, Toggle::On);
            info!("Font spacing removal {}", if config.remove_font_spacing { "enabled" } else { "disabled" });
        }
        ConfigCommand::Reset => {
            store.reset()?;
            info!("Configuration has been reset to defaults");
            return Ok(());
        }
    }

    config.validate().context("Configuration validation failed")?;
    store.save(&config)?;
    info!("Configuration has been saved to {:?}", store.path());

    Ok(())
}
