use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bz_localizer_core::{
    parse_manual_input, BatchEvent, BatchOptions, BatchRequest, BatchRunner, GoogleTranslator,
    InstallPreset, LocalizationEntry, LocalizerConfig, OdfScanner,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "bz-localizer",
    about = "Translate English strings and append them to the Battlezone 98 Redux localization table"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Path to localization_table.csv
    #[arg(long, global = true)]
    table: Option<PathBuf>,
    /// Use a known install location for the table
    #[arg(long, value_enum, global = true)]
    preset: Option<PresetArg>,
    /// Pause before each translation request, in milliseconds
    #[arg(long, global = true)]
    delay_ms: Option<u64>,
    /// Alternative config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    Steam,
    Gog,
}

impl From<PresetArg> for InstallPreset {
    fn from(value: PresetArg) -> Self {
        match value {
            PresetArg::Steam => InstallPreset::Steam,
            PresetArg::Gog => InstallPreset::Gog,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Translate lines from a file (or stdin) and append them
    Manual {
        /// Text file with one entry per line; stdin when omitted
        #[arg(long, short)]
        input: Option<PathBuf>,
    },
    /// Scan a folder for ODF files and append their unit names
    Scan {
        folder: PathBuf,
        /// Only list discovered units
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the kind and key derived for each input line
    Keys {
        #[arg(long, short)]
        input: Option<PathBuf>,
    },
    /// Show where the Steam and GOG presets point
    Presets,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.common)?;

    match cli.command {
        Command::Manual { input } => {
            let text = read_input(input.as_deref())?;
            let entries = parse_manual_input(&text, &config.mission_marker);
            run(&config, entries).await
        }
        Command::Scan { folder, dry_run } => {
            let units = OdfScanner::new(config.scan_config())
                .scan(&folder)
                .with_context(|| format!("cannot scan {}", folder.display()))?;
            println!("Found {} unit files", units.len());
            for unit in &units {
                println!("{}\t{}\t{}", unit.key, unit.display_name, unit.path.display());
            }
            if dry_run {
                return Ok(());
            }
            let entries = units.iter().map(|unit| unit.to_entry()).collect();
            run(&config, entries).await
        }
        Command::Keys { input } => {
            let text = read_input(input.as_deref())?;
            for entry in parse_manual_input(&text, &config.mission_marker) {
                let kind = if entry.is_mission_title() { "mission" } else { "name" };
                println!("{kind}\t{}\t{}", entry.key, entry.english);
            }
            Ok(())
        }
        Command::Presets => {
            for preset in [InstallPreset::Steam, InstallPreset::Gog] {
                let resolution = preset.resolve();
                println!("{}\t{}", resolution.path.display(), resolution.message);
            }
            Ok(())
        }
    }
}

fn load_config(args: &CommonArgs) -> Result<LocalizerConfig> {
    let mut config = match &args.config {
        Some(path) => LocalizerConfig::load_from(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => LocalizerConfig::load().context("cannot load config")?,
    };
    if let Some(preset) = args.preset {
        config.default_preset = preset.into();
        config.table_path = None;
    }
    if let Some(table) = &args.table {
        config.table_path = Some(table.clone());
    }
    if let Some(delay) = args.delay_ms {
        config.call_delay_ms = delay;
    }
    Ok(config)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("cannot read stdin")?;
            Ok(text)
        }
    }
}

async fn run(config: &LocalizerConfig, entries: Vec<LocalizationEntry>) -> Result<()> {
    let table_path = config.resolved_table_path();

    let translator = GoogleTranslator::new(
        &config.translate_endpoint,
        &config.source_language,
        config.request_timeout(),
    )?;
    let runner = BatchRunner::new();
    let mut handle = runner.start(
        Arc::new(translator),
        BatchRequest {
            entries,
            table_path,
            options: BatchOptions {
                call_delay: config.call_delay(),
            },
        },
    )?;

    while let Some(event) = handle.events.recv().await {
        match event {
            BatchEvent::Log { message } => println!("{message}"),
            BatchEvent::Progress { done, total } => eprintln!("[{done}/{total}]"),
            BatchEvent::Failed { message } => eprintln!("Error: {message}"),
            _ => {}
        }
    }

    let summary = handle.task.await??;
    if summary.appended == 0 {
        println!("Nothing new to add.");
    }
    if summary.rejected > 0 {
        bail!("{} entries were rejected", summary.rejected);
    }
    Ok(())
}
