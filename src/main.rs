use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use gridsight::analytics::events;
use gridsight::cli::{self, OutputFormat};
use gridsight::filter::FilterForm;
use gridsight::workflow::{BulbForm, Dashboard};
use gridsight::{config, web};

#[derive(Debug, Parser)]
#[command(name = "gridsight")]
#[command(about = "Smart-grid monitoring: energy forecasts, fault prediction and reading search")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Forecast energy demand (defaults: now, lag_24h=135.5, Temp=22.5, RH=55, FF=15, P=1012)
    Energy {
        /// Override an input, e.g. --set Temp=18.5 (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
        /// Ask the generative model for insights on the forecast
        #[arg(long)]
        insights: bool,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Predict whether a bulb reading indicates a fault
    Fault {
        /// Override an input, e.g. --set powerConsumption=151.5 (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,
        /// Ask the generative model for diagnostic steps when a fault is predicted
        #[arg(long)]
        insights: bool,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Nearest-timestamp search over an uploaded dataset
    Search {
        #[command(subcommand)]
        action: SearchAction,
    },
    /// Show, clear or replay a prediction history log (energy or fault)
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Send a free-form prompt to the generative model
    Insights {
        /// Prompt text
        #[arg(trailing_var_arg = true, required = true)]
        prompt: Vec<String>,
    },
    /// Launch the web dashboard
    Web {
        /// Address to bind, overriding [web] addr
        #[arg(long)]
        addr: Option<String>,
        /// Do not open a browser window
        #[arg(long)]
        no_browser: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum SearchAction {
    /// Upload a dataset file to the backend
    Upload {
        /// CSV file with bulb readings
        file: PathBuf,
    },
    /// Upload a dataset and list the readings nearest to a timestamp
    Query {
        /// Timestamp to search for
        timestamp: String,
        /// Dataset file to upload before searching
        #[arg(long)]
        file: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
        /// Ask the generative model to analyze the neighbours
        #[arg(long)]
        insights: bool,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Add one reading to the search index
    Add(BulbArgs),
}

#[derive(Debug, Args)]
struct FilterArgs {
    /// Keep bulbs whose number contains this text
    #[arg(long)]
    bulb: Option<String>,
    /// Keep readings whose conditions contain this text (case-insensitive)
    #[arg(long)]
    env: Option<String>,
    #[arg(long)]
    power_min: Option<String>,
    #[arg(long)]
    power_max: Option<String>,
    #[arg(long)]
    voltage_min: Option<String>,
    #[arg(long)]
    voltage_max: Option<String>,
    #[arg(long)]
    temp_min: Option<String>,
    #[arg(long)]
    temp_max: Option<String>,
}

impl From<FilterArgs> for FilterForm {
    fn from(args: FilterArgs) -> Self {
        Self {
            bulb_number: args.bulb.unwrap_or_default(),
            env_cond: args.env.unwrap_or_default(),
            power_min: args.power_min.unwrap_or_default(),
            power_max: args.power_max.unwrap_or_default(),
            voltage_min: args.voltage_min.unwrap_or_default(),
            voltage_max: args.voltage_max.unwrap_or_default(),
            temp_min: args.temp_min.unwrap_or_default(),
            temp_max: args.temp_max.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Args)]
struct BulbArgs {
    #[arg(long)]
    bulb_number: String,
    /// Reading time (default: now)
    #[arg(long)]
    timestamp: Option<String>,
    #[arg(long)]
    power: String,
    #[arg(long)]
    voltage: String,
    #[arg(long)]
    current: String,
    #[arg(long)]
    temperature: String,
    #[arg(long)]
    current_env: String,
    /// Environmental conditions (default: Clear)
    #[arg(long)]
    env: Option<String>,
}

impl From<BulbArgs> for BulbForm {
    fn from(args: BulbArgs) -> Self {
        let defaults = BulbForm::default();
        Self {
            bulb_number: args.bulb_number,
            timestamp: args.timestamp.unwrap_or(defaults.timestamp),
            power_consumption: args.power,
            voltage_levels: args.voltage,
            current_fluctuations: args.current,
            temperature: args.temperature,
            current_fluctuations_env: args.current_env,
            environmental_conditions: args.env.unwrap_or(defaults.environmental_conditions),
        }
    }
}

#[derive(Debug, Subcommand)]
enum HistoryAction {
    /// List a log, newest first
    Show {
        /// energy or fault
        log: String,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Remove every entry from a log
    Clear {
        /// energy or fault
        log: String,
    },
    /// Print the inputs of one entry (0 = newest)
    Replay {
        /// energy or fault
        log: String,
        index: usize,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show effective configuration
    Show,
    /// Create default config file at ~/.gridsight/config.toml
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Set a config value (e.g., gridsight config set backend.url http://host:5000)
    Set {
        /// Dotted key path (e.g., insights.model)
        key: String,
        /// Value to set
        value: String,
    },
    /// Reset config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();
    let config = config::load();
    events::init(&config.logging);

    match app.command {
        Commands::Energy {
            set,
            insights,
            format,
        } => cli::run_energy(&config, &set, insights, format_of(&format)),
        Commands::Fault {
            set,
            insights,
            format,
        } => cli::run_fault(&config, &set, insights, format_of(&format)),
        Commands::Search { action } => match action {
            SearchAction::Upload { file } => cli::run_search_upload(&config, &file),
            SearchAction::Query {
                timestamp,
                file,
                filters,
                insights,
                format,
            } => cli::run_search_query(
                &config,
                &file,
                &timestamp,
                filters.into(),
                insights,
                format_of(&format),
            ),
            SearchAction::Add(args) => cli::run_search_add(&config, &args.into()),
        },
        Commands::History { action } => match action {
            HistoryAction::Show { log, format } => {
                cli::run_history_show(&config, &log, format_of(&format))
            }
            HistoryAction::Clear { log } => cli::run_history_clear(&config, &log),
            HistoryAction::Replay { log, index, format } => {
                cli::run_history_replay(&config, &log, index, format_of(&format))
            }
        },
        Commands::Insights { prompt } => cli::run_insights(&config, &prompt.join(" ")),
        Commands::Web { addr, no_browser } => {
            let addr = addr.unwrap_or_else(|| config.web.addr.clone());
            let open = config.web.open_browser && !no_browser;
            web::serve(&addr, open, Dashboard::open(&config))
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}

fn format_of(format: &str) -> OutputFormat {
    OutputFormat::from_str_opt(Some(format))
}
