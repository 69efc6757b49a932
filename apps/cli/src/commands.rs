//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use folio_core::pipeline::{
    CancelFlag, ConvertResult, ProgressReporter, convert_dir, convert_file,
};
use folio_shared::{
    AppConfig, ConvertConfig, SplitMode, init_config, load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// folio — plain-text directories in, one navigable PDF out.
#[derive(Parser)]
#[command(
    name = "folio",
    version,
    about = "Convert directories of plain-text files into a single navigable PDF.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Convert all matching files in a directory into one PDF.
    Convert {
        /// Directory containing the input files.
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Directory for the output subfolder (defaults to the input
        /// directory's parent).
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Extension of files to convert (default from config, usually txt).
        #[arg(short, long)]
        extension: Option<String>,

        /// Run label used for the document title, headers, and footers.
        #[arg(short = 'k', long)]
        keywords: Option<String>,

        /// Discover input files recursively.
        #[arg(short, long)]
        recursive: bool,

        /// Skip semantic paragraph splitting (one sentence per paragraph).
        #[arg(long)]
        no_split: bool,

        /// Narrow e-writer style text column.
        #[arg(long)]
        ewriter: bool,
    },

    /// Convert a single text file into a PDF (no table of contents).
    File {
        /// The input file.
        path: PathBuf,

        /// Directory for the output PDF (defaults to the file's directory).
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Run label used for the document title, headers, and footers.
        #[arg(short = 'k', long)]
        keywords: Option<String>,

        /// Skip semantic paragraph splitting (one sentence per paragraph).
        #[arg(long)]
        no_split: bool,

        /// Narrow e-writer style text column.
        #[arg(long)]
        ewriter: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "folio=info",
        1 => "folio=debug",
        _ => "folio=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Convert {
            input_dir,
            output_dir,
            extension,
            keywords,
            recursive,
            no_split,
            ewriter,
        } => {
            cmd_convert(
                input_dir, output_dir, extension, keywords, recursive, no_split, ewriter,
            )
            .await
        }
        Command::File {
            path,
            output_dir,
            keywords,
            no_split,
            ewriter,
        } => cmd_file(path, output_dir, keywords, no_split, ewriter).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Merge CLI flags over the loaded config.
fn build_convert_config(
    config: &AppConfig,
    input_dir: PathBuf,
    output_dir: Option<PathBuf>,
    extension: Option<String>,
    keywords: Option<String>,
    recursive: bool,
    no_split: bool,
    ewriter: bool,
) -> ConvertConfig {
    let mut run = ConvertConfig::from_config(config, input_dir);
    run.output_dir = output_dir;
    if let Some(ext) = extension {
        run.extension = ext;
    }
    run.key_phrase = keywords;
    if recursive {
        run.recurse = true;
    }
    if no_split {
        run.segmentation.split_mode = SplitMode::Sentences;
    }
    if ewriter {
        run.narrow_margins = true;
    }
    run
}

#[allow(clippy::too_many_arguments)]
async fn cmd_convert(
    input_dir: PathBuf,
    output_dir: Option<PathBuf>,
    extension: Option<String>,
    keywords: Option<String>,
    recursive: bool,
    no_split: bool,
    ewriter: bool,
) -> Result<()> {
    let config = load_config()?;
    let run_config = build_convert_config(
        &config, input_dir, output_dir, extension, keywords, recursive, no_split, ewriter,
    );

    info!(
        input = %run_config.input_dir.display(),
        extension = %run_config.extension,
        recurse = run_config.recurse,
        "converting directory"
    );

    let reporter = CliProgress::new();
    let result = convert_dir(&run_config, &reporter, &CancelFlag::new()).await?;
    print_summary(&result);
    Ok(())
}

async fn cmd_file(
    path: PathBuf,
    output_dir: Option<PathBuf>,
    keywords: Option<String>,
    no_split: bool,
    ewriter: bool,
) -> Result<()> {
    let config = load_config()?;
    let input_dir = path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let run_config = build_convert_config(
        &config, input_dir, output_dir, None, keywords, false, no_split, ewriter,
    );

    info!(input = %path.display(), "converting single file");

    let reporter = CliProgress::new();
    let result = convert_file(&run_config, &path, &reporter, &CancelFlag::new()).await?;
    print_summary(&result);
    Ok(())
}

fn print_summary(result: &ConvertResult) {
    let mode = match result.split_mode {
        SplitMode::Semantic => "semantic",
        SplitMode::Sentences => "sentences",
    };
    println!();
    println!("  PDF written successfully!");
    println!("  Run:      {}", result.run_id);
    println!("  Chapters: {}", result.chapter_count);
    println!("  Pages:    {}", result.page_count);
    println!("  Split:    {mode}");
    println!("  Path:     {}", result.output_path.display());
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn chapter_segmented(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Segmenting [{current}/{total}] {title}"));
    }

    fn done(&self, _result: &ConvertResult) {
        self.spinner.finish_and_clear();
    }
}
