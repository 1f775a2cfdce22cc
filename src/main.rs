//! # docimport CLI
//!
//! Imports the files listed in a CSV manifest into a Hornbill instance.
//!
//! ## Usage
//!
//! ```bash
//! docimport --instance-id acme --api-key KEY --csvd csv/documents.csv \
//!     --csvs csv/shares.csv --csvc csv/collections.csv --csvt csv/tags.csv
//! ```
//!
//! Every option can also be set in `./config/docimport.toml` (or the file
//! given with `--config`); command-line values win.
//!
//! ## Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Run completed (individual rows may have failed, see the summary) |
//! | 1 | Start-up failed: bad config file, log folder, input file or endpoint |
//! | 2 | A mandatory option is missing |

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info};

use docimport::config::{self, Config, MissingOptions, Overrides};
use docimport::import::Importer;
use docimport::loader;
use docimport::logging::{self, CONSOLE};
use docimport::progress::ProgressFormat;
use docimport::transport::{DryRunTransport, HttpTransport, Transport};

const DEFAULT_CONFIG: &str = "./config/docimport.toml";

/// Hornbill document import utility.
#[derive(Parser)]
#[command(
    name = "docimport",
    version,
    about = "Import files and their metadata into the Hornbill document library"
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults to `./config/docimport.toml`
    /// when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Instance id, used to look up the API endpoint.
    #[arg(long)]
    instance_id: Option<String>,

    /// API key for the importing user.
    #[arg(long)]
    api_key: Option<String>,

    /// Use this API endpoint instead of looking it up from the instance id.
    #[arg(long)]
    endpoint: Option<String>,

    /// Documents CSV: path,title,status,description,reviewDate,versioningEnabled,owner
    #[arg(long)]
    csvd: Option<PathBuf>,

    /// Shares CSV: path,urn,read,modifyContent,modifyMetaData
    #[arg(long)]
    csvs: Option<PathBuf>,

    /// Collections CSV: path,collectionId
    #[arg(long)]
    csvc: Option<PathBuf>,

    /// Tags CSV: path,tagName
    #[arg(long)]
    csvt: Option<PathBuf>,

    /// Request timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Log every call instead of sending it.
    #[arg(long)]
    dry_run: bool,

    /// Write debug output, including request and response bodies, to the log.
    #[arg(long)]
    debug: bool,

    /// Folder for the run log.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Progress on stderr: off, human or json. Defaults to human on a TTY.
    #[arg(long, value_enum)]
    progress: Option<ProgressFormat>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            instance_id: self.instance_id.clone(),
            api_key: self.api_key.clone(),
            endpoint: self.endpoint.clone(),
            timeout_secs: self.timeout,
            documents: self.csvd.clone(),
            shares: self.csvs.clone(),
            collections: self.csvc.clone(),
            tags: self.csvt.clone(),
            log_dir: self.log_dir.clone(),
            dry_run: self.dry_run,
            debug: self.debug,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return if e.downcast_ref::<MissingOptions>().is_some() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            };
        }
    };

    let log_file = match logging::init(&cfg.log.dir, cfg.log.debug) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let progress = ProgressFormat::pick(cli.progress, atty::is(atty::Stream::Stderr));
    match run(&cfg, progress) {
        Ok(()) => {
            info!(target: CONSOLE, "Log written to {}", log_file.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(target: CONSOLE, "{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let file = match &cli.config {
        Some(path) => config::load_file(path, true)?,
        None => config::load_file(Path::new(DEFAULT_CONFIG), false)?,
    };
    config::resolve(file, cli.overrides())
}

fn run(cfg: &Config, progress: ProgressFormat) -> anyhow::Result<()> {
    info!(
        target: CONSOLE,
        "---- Hornbill Document Import Utility V{} ----",
        env!("CARGO_PKG_VERSION")
    );
    for line in cfg.describe() {
        info!("{}", line);
    }
    debug!(" api key      {}", cfg.instance.api_key);

    let rows = loader::load_rows(&cfg.input)?;
    if rows.is_empty() {
        error!(
            target: CONSOLE,
            "No rows found in {}",
            cfg.input.documents.display()
        );
    }

    let transport: Box<dyn Transport> = if cfg.dry_run {
        info!(target: CONSOLE, "Dry run: no changes will be made");
        Box::new(DryRunTransport)
    } else {
        match &cfg.instance.endpoint {
            Some(endpoint) => Box::new(HttpTransport::new(
                endpoint,
                &cfg.instance.api_key,
                cfg.instance.timeout(),
            )?),
            None => Box::new(HttpTransport::connect(
                &cfg.instance.id,
                &cfg.instance.api_key,
                cfg.instance.timeout(),
            )?),
        }
    };

    let mut importer = Importer::new(transport.as_ref()).with_progress(progress.reporter());
    let counters = importer.run(rows);

    info!(target: CONSOLE, "Processing Complete!");
    counters.report();
    Ok(())
}
