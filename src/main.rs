use anyhow::Result;
use clap::{Parser, Subcommand};

use loadwatch::cli::{self, FilterArgs, OutputFormat};
use loadwatch::config;

#[derive(Debug, Parser)]
#[command(name = "loadwatch")]
#[command(about = "Live load board and carrier-call metrics for a freight brokerage backend")]
struct App {
    /// Serve built-in sample data instead of calling the backend
    #[arg(long, global = true)]
    demo: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args)]
struct FilterFlags {
    /// Tab: available (default), booked, all
    #[arg(long)]
    tab: Option<String>,
    /// Exact equipment type, e.g. "Dry Van"
    #[arg(long)]
    equipment: Option<String>,
    /// Case-insensitive search over id, origin, destination and equipment
    #[arg(long)]
    search: Option<String>,
}

impl From<FilterFlags> for FilterArgs {
    fn from(flags: FilterFlags) -> Self {
        Self {
            tab: flags.tab,
            equipment: flags.equipment,
            search: flags.search,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Poll the backend and redraw the load board in the terminal
    Watch {
        #[command(flatten)]
        filters: FilterFlags,
    },
    /// Poll the backend and serve the web dashboard
    Serve {
        /// Bind address (default from config: 127.0.0.1:9850)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Fetch once and print the filtered loads
    Loads {
        #[command(flatten)]
        filters: FilterFlags,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Fetch once and print the details of one load
    Show {
        /// Load id, e.g. LOAD-001
        load_id: String,
    },
    /// Fetch once and print recent carrier calls
    Calls {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Fetch once and print call KPIs and breakdowns
    Metrics {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Check config, backend reachability and the activity log
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default config file to ~/.loadwatch/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `refresh.interval_ms 30000`
    Set { key: String, value: String },
    /// Reset the global config file to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();
    let demo = app.demo;

    match app.command {
        Commands::Watch { filters } => cli::run_watch(&config::load(), &filters.into(), demo),
        Commands::Serve { addr } => cli::run_serve(&config::load(), addr.as_deref(), demo),
        Commands::Loads { filters, format } => {
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_loads(&config::load(), &filters.into(), fmt, demo)
        }
        Commands::Show { load_id } => cli::run_show(&config::load(), &load_id, demo),
        Commands::Calls { format } => {
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_calls(&config::load(), fmt, demo)
        }
        Commands::Metrics { format } => {
            let fmt = OutputFormat::from_str_opt(Some(&format));
            cli::run_metrics(&config::load(), fmt, demo)
        }
        Commands::Health => cli::run_health(),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
