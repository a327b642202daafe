mod logging;

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use playsort_core::config::AppConfig;
use playsort_core::matcher::ClassificationResult;
use playsort_runtime::{RunReport, Runtime, VideoOutcome};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file to use instead of the one in the user config directory
    #[arg(short, long, env = "PLAYSORT_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    sync: SyncArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug)]
struct SyncArgs {
    /// Channel whose upload feed is sorted
    #[arg(long, env = "TARGET_CHANNEL_ID", global = true)]
    channel_id: Option<String>,

    /// Maximum number of new playlist insertions per run
    #[arg(long, env = "MAX_PROCESS_COUNT", global = true)]
    max_process_count: Option<usize>,

    /// Disable the per-run insertion cap
    #[arg(long, global = true)]
    unlimited: bool,

    /// Print the run report as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sort new uploads into playlists (default)
    Sync,
    /// Authorize access to the YouTube account and save a token file
    Authorize,
    /// Validate the rule file and list rules in match order
    Rules,
    /// Show where a title would be sorted, without changing anything
    Classify {
        /// Video title to classify
        title: String,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write the default config file if it doesn't exist
    Init,
    /// Print the path to the config file
    Path,
}

impl SyncArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(channel_id) = &self.channel_id {
            config.sync.channel_id = channel_id.clone();
        }
        if let Some(max) = self.max_process_count {
            config.sync.max_process_count = max;
        }
        if self.unlimited {
            config.sync.unlimited = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);

    // Config commands must work before a valid config exists.
    if let Some(Commands::Config(cmd)) = &cli.command {
        return config_command(cmd, &config_path);
    }

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    cli.sync.apply(&mut config);

    let _guard = logging::init(&config.logging);
    tracing::debug!(config = %config_path.display(), "playsort starting");

    let runtime = Runtime::new(config);
    match cli.command.unwrap_or(Commands::Sync) {
        Commands::Sync => {
            let report = runtime.sync().await.inspect_err(|e| {
                tracing::error!(error = %e, "Sync failed");
            })?;
            if cli.sync.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Authorize => {
            let path = runtime.authorize().await?;
            println!("Saved credentials to {}", path.display());
        }
        Commands::Rules => {
            let rules = runtime.rules()?;
            for (i, rule) in rules.iter().enumerate() {
                match &rule.description {
                    Some(desc) => println!("{:>3}. {}  ({desc})", i + 1, rule.keyword),
                    None => println!("{:>3}. {}", i + 1, rule.keyword),
                }
            }
            println!("{} rule(s) OK", rules.len());
        }
        Commands::Classify { title } => match runtime.classify(&title).await? {
            ClassificationResult::Matched {
                playlist_id,
                keyword,
            } => println!("{keyword} -> {playlist_id}"),
            ClassificationResult::Unmatched => println!("unmatched"),
        },
        Commands::Config(cmd) => config_command(&cmd, &config_path)?,
    }

    Ok(())
}

fn config_command(cmd: &ConfigCommands, path: &Path) -> Result<(), Box<dyn Error>> {
    match cmd {
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Init if path.exists() => {
            println!("Config already exists at {}", path.display());
        }
        ConfigCommands::Init => {
            AppConfig::default().save(path)?;
            println!("Wrote default config to {}", path.display());
        }
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    for video in &report.examined {
        let line = match &video.outcome {
            VideoOutcome::Inserted { playlist_id, keyword } => {
                format!("added      [{keyword}] -> {playlist_id}")
            }
            VideoOutcome::AlreadyPresent { playlist_id, .. } => {
                format!("present    {playlist_id}")
            }
            VideoOutcome::Unmatched => "unmatched".to_string(),
            VideoOutcome::Failed { playlist_id, error } => {
                format!("failed     {playlist_id}: {error}")
            }
        };
        println!("{} {}  {line}  {}", video.published_at, video.video_id, video.title);
    }

    println!(
        "{} added, {} already present, {} unmatched, {} failed ({} candidates, {} playlists)",
        report.inserted(),
        report.already_present(),
        report.unmatched(),
        report.failed(),
        report.candidates,
        report.playlists,
    );
    if report.cap_reached {
        println!("Processing cap reached; remaining videos will be handled next run.");
    }
    println!("Watermark: {} -> {}", report.watermark_before, report.watermark_after);
}
