use clap::Parser;

pub const DEFAULT_MODE: &str = "audit";
pub const DEFAULT_INTERVAL: u64 = 300;
pub const DEFAULT_TIMEOUT: u64 = 15;
pub const DEFAULT_OUTPUT: &str = "text";

#[derive(Parser, Debug, Clone)]
#[command(name = "seowatch")]
#[command(
    about = "Audit a page's SEO, watch it for content drift, or schedule recurring site audits",
    long_about = None
)]
pub struct Cli {
    /// The URL to audit or watch
    #[arg(value_name = "URL")]
    pub url: String,

    /// Mode: audit (one page, once), monitor (watch for changes)
    /// or schedule (recurring multi-page audits)
    #[arg(short, long, default_value = DEFAULT_MODE)]
    pub mode: String,

    /// Seconds between checks in monitor and schedule modes
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL)]
    pub interval: u64,

    /// Per-fetch timeout in seconds
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT)]
    pub timeout: u64,

    /// Stop after this many checks or runs (monitor and schedule modes)
    #[arg(long)]
    pub max_cycles: Option<u64>,

    /// Output format: text or json
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: String,

    /// Save report to file
    #[arg(short, long)]
    pub save: Option<String>,

    /// File used to persist scheduled-run history between sessions
    #[arg(long)]
    pub history_file: Option<String>,

    /// Rate limit for requests per second (optional, e.g., 1.0 for 1 req/s)
    #[arg(short = 'r', long)]
    pub rate_limit: Option<f64>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to configuration file (JSON, TOML, or YAML)
    #[arg(long)]
    pub config: Option<String>,
}
