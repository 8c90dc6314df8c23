mod app;
mod logging;
mod render;
mod settings;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::bail;
use clap::{Parser, Subcommand};
use cuefinder_logging::search_warn;

use settings::{AppSettings, DEFAULT_CONFIG_FILE};

/// Finds the videos of a channel whose transcripts mention a phrase.
#[derive(Parser)]
#[command(
    name = "cuefinder",
    version,
    after_help = "Logs are written to ./cuefinder.log unless the config says otherwise."
)]
struct Cli {
    /// Path to the settings file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search a channel's transcripts for a cue
    Search {
        /// Channel URL (e.g. https://youtube.com/@handle) or channel name
        #[arg(long)]
        channel: String,

        /// Text to look for
        #[arg(long)]
        cue: String,

        /// Overrides the listing service URL from the settings file
        #[arg(long)]
        listing_url: Option<String>,

        /// Overrides the transcript service URL from the settings file
        #[arg(long)]
        transcript_url: Option<String>,

        /// Search every batch without asking
        #[arg(long)]
        all: bool,

        /// Mark matches with brackets instead of color
        #[arg(long)]
        no_color: bool,
    },

    /// Write the default settings file
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::InitConfig { force } => {
            if cli.config.exists() && !force {
                bail!("{:?} already exists; pass --force to replace it", cli.config);
            }
            AppSettings::default().save(&cli.config)?;
            println!("Wrote {:?}", cli.config);
            Ok(ExitCode::SUCCESS)
        }
        Command::Search {
            channel,
            cue,
            listing_url,
            transcript_url,
            all,
            no_color,
        } => {
            let loaded = AppSettings::load(&cli.config);
            let mut settings = loaded.settings;
            logging::initialize(settings.log_destination, cli.verbose);
            if let Some(warning) = loaded.warning {
                search_warn!("{}", warning);
                eprintln!("warning: {warning}");
            }

            if let Some(url) = listing_url {
                settings.listing_base_url = url;
            }
            if let Some(url) = transcript_url {
                settings.transcript_base_url = url;
            }

            let args = app::SearchArgs {
                channel,
                cue,
                color: !no_color && std::io::stdout().is_terminal(),
                all,
            };
            match app::run(settings.services(), args).await? {
                app::Outcome::Finished => Ok(ExitCode::SUCCESS),
                app::Outcome::Failed => Ok(ExitCode::FAILURE),
            }
        }
    }
}
