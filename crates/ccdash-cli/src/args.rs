use ccdash_core::DateRange;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ccdash")]
#[command(about = "ccdash - call-center KPI and classification reports", long_about = None)]
pub struct Cli {
    /// Config file (YAML, or TOML by extension)
    #[arg(long, env = "CCDASH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database, overriding the configured path
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true, default_value = "false")]
    pub pretty: bool,

    /// Print Prometheus metrics to stderr when done
    #[arg(long, global = true, default_value = "false")]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Produce a report as JSON
    Report {
        #[command(subcommand)]
        report: ReportCommand,
    },
    /// Import JSONL record exports into the database
    Import {
        /// calls, chats or requests
        #[arg(long)]
        kind: String,

        /// Fail on the first undecodable line instead of skipping it
        #[arg(long, default_value = "false")]
        strict: bool,

        /// JSONL files, one record per line
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Row counts per raw queue plus the AML daily breakdown
    QueueStats {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Check whether the record store answers
    Status,
}

#[derive(Subcommand)]
pub enum ReportCommand {
    /// One KPI row per calendar date
    Daily(RangeArgs),
    /// One KPI row per day of month
    Monthly(RangeArgs),
    /// One metric across 24 hour columns per date
    Hourly {
        #[command(flatten)]
        range: RangeArgs,

        /// calls, aht, sl, abandoned, chats, frt, rt, agents or total
        #[arg(long, default_value = "total")]
        metric: String,
    },
    /// Classifier path counts per date, topic and subtopic
    Classifiers {
        #[command(flatten)]
        range: RangeArgs,

        #[arg(long, value_enum, default_value_t = Channel::Overall)]
        channel: Channel,
    },
    /// Topic counts per date with their share of the day
    Topics(RangeArgs),
    /// Distinct topics seen in the range
    AvailableTopics(RangeArgs),
    /// Subtopic counts per date for one topic
    Subtopics {
        #[command(flatten)]
        range: RangeArgs,

        #[arg(long)]
        topic: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Channel {
    Call,
    Chat,
    Overall,
}

#[derive(Args)]
pub struct RangeArgs {
    /// First day, YYYY-MM-DD
    #[arg(long)]
    pub start: String,

    /// Last day, inclusive; defaults to the start day
    #[arg(long)]
    pub end: Option<String>,

    /// all, m10, aml or a raw queue name
    #[arg(long, default_value = "all")]
    pub queue: String,
}

impl RangeArgs {
    pub fn date_range(&self) -> ccdash_core::Result<DateRange> {
        DateRange::parse(&self.start, self.end.as_deref().unwrap_or(&self.start))
    }
}
