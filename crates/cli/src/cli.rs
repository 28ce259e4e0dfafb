use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Scanner and renderer decisions
    Debug,
    /// Everything, including index builds
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "docflow")]
#[command(about = "docflow - render line-oriented markdown documents to HTML or data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace).
    /// RUST_LOG takes precedence when set.
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Level used when RUST_LOG is not set.
    pub fn level_filter(&self) -> LevelFilter {
        match (self.log_level, self.verbose) {
            (Some(level), _) => level.into(),
            (None, true) => LevelFilter::DEBUG,
            (None, false) => LevelFilter::WARN,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render a document to HTML
    Html {
        file: PathBuf,

        /// Only render the section at this dotted header path (e.g. intro.setup)
        #[arg(short, long)]
        part: Option<String>,

        /// Link headers to {url-base}/{anchor path}
        #[arg(long, env = "DOCFLOW_URL_BASE")]
        url_base: Option<String>,

        /// Number headers (1., 1.1., ...)
        #[arg(short, long)]
        numbered: bool,

        /// Add loading="lazy" to images
        #[arg(long)]
        lazy_images: bool,

        /// Add rel="noopener noreferrer" to external links
        #[arg(long)]
        noopener: bool,
    },

    /// Print the data tree as JSON
    Data {
        file: PathBuf,

        /// Only project the section at this dotted header path
        #[arg(short, long)]
        part: Option<String>,

        /// Include paragraph text (_text) and raw data blocks (_data)
        #[arg(long)]
        text: bool,

        /// Leave tables out
        #[arg(long)]
        no_tables: bool,
    },

    /// Print the flat event stream, indented by level
    Stream { file: PathBuf },

    /// Print the event stream as a JSON tree
    Tree { file: PathBuf },

    /// Check that TARGET contains every header path of REFERENCE
    Check { reference: PathBuf, target: PathBuf },

    /// Resolve typed CSV records and print them as JSON, keyed by name
    Csv {
        /// CSV file with the instances
        instances: PathBuf,

        /// CSV files with the type records
        types: Vec<PathBuf>,
    },
}
