//! CLI command implementations for gridsight.
//!
//! Provides subcommand handlers for:
//! - `gridsight energy`: energy-demand forecast
//! - `gridsight fault`: fault prediction for one sensor reading
//! - `gridsight search upload|query|add`: nearest-timestamp search
//! - `gridsight history show|clear|replay`: prediction history logs
//! - `gridsight insights "prompt"`: raw generative-text call
//! - `gridsight config show|init|set|reset`: configuration management

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::client::{EnergyPrediction, FaultSummary, SearchResult};
use crate::config::{self, GridsightConfig};
use crate::filter::{FilterForm, NeighborRecord};
use crate::history::{FieldValue, Fields, HistoryLog, LogEntry};
use crate::llm;
use crate::workflow::{self, BulbForm, Dashboard};

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            _ => Self::Table,
        }
    }
}

/// Parse `name=value` overrides into form fields. Values are kept as text,
/// exactly as typed.
pub fn parse_assignments(pairs: &[String]) -> Result<Fields> {
    pairs
        .iter()
        .map(|pair| {
            let (name, value) = pair
                .split_once('=')
                .with_context(|| format!("expected name=value, got '{pair}'"))?;
            Ok((name.trim().to_string(), FieldValue::from(value.trim())))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// gridsight energy
// ---------------------------------------------------------------------------

/// Forecast energy demand from the default form overlaid with `overrides`.
pub fn run_energy(
    config: &GridsightConfig,
    overrides: &[String],
    insights: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut inputs = workflow::energy::default_inputs();
    inputs.extend(parse_assignments(overrides)?);

    let mut dashboard = Dashboard::open(config);
    let prediction = dashboard.energy.submit(inputs)?;

    match format {
        OutputFormat::Json => print_json(&prediction)?,
        OutputFormat::Table => print_energy_table(&prediction),
    }

    if insights {
        print_insight(&dashboard.energy.insights(dashboard.insights_config())?);
    }
    Ok(())
}

fn print_energy_table(prediction: &EnergyPrediction) {
    println!(
        "{}",
        format!("Energy Demand Forecast: {}", prediction.timestamp)
            .bold()
            .cyan()
    );
    println!("{}", "=".repeat(50));
    println!(
        "  {} {} W",
        "Average:".bold(),
        prediction.average_display().green().bold()
    );
    println!();
    println!("  {:<24} {:>12}", "Model", "Prediction");
    println!("  {}", "-".repeat(37));
    for (i, (model, value)) in prediction.predictions.iter().enumerate() {
        let line = format!("  {:<24} {:>10} W", truncate(model, 24), value);
        print_striped(i, &line);
    }
}

// ---------------------------------------------------------------------------
// gridsight fault
// ---------------------------------------------------------------------------

/// Predict a fault from the default form overlaid with `overrides`.
pub fn run_fault(
    config: &GridsightConfig,
    overrides: &[String],
    insights: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut inputs = workflow::fault::default_inputs();
    inputs.extend(parse_assignments(overrides)?);

    let mut dashboard = Dashboard::open(config);
    let summary = dashboard.fault.submit(inputs)?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => print_fault_table(&summary),
    }

    if insights {
        if summary.is_fault() {
            print_insight(&dashboard.fault.insights(dashboard.insights_config())?);
        } else {
            println!("{}", "No fault predicted; no diagnostic steps needed.".dimmed());
        }
    }
    Ok(())
}

fn print_fault_table(summary: &FaultSummary) {
    println!("{}", "Fault Prediction".bold().cyan());
    println!("{}", "=".repeat(50));
    let verdict = if summary.is_fault() {
        summary.binary.prediction.red().bold()
    } else {
        summary.binary.prediction.green().bold()
    };
    println!(
        "  {} {}  (fault {:.2}% / no fault {:.2}%)",
        "Verdict:".bold(),
        verdict,
        summary.binary.probability,
        summary.no_fault_percent()
    );
    println!(
        "  {} {}",
        "Type:   ".bold(),
        summary.multiclass.prediction.bold()
    );

    if !summary.multiclass.probabilities.is_empty() {
        println!();
        println!("  {:<24} {:>10}", "Class", "Probability");
        println!("  {}", "-".repeat(35));
        for (i, (class, p)) in summary.multiclass.probabilities.iter().enumerate() {
            print_striped(i, &format!("  {:<24} {:>9.2}%", truncate(class, 24), p));
        }
    }
}

// ---------------------------------------------------------------------------
// gridsight search
// ---------------------------------------------------------------------------

/// Upload a dataset file for the search index.
pub fn run_search_upload(config: &GridsightConfig, path: &Path) -> Result<()> {
    let mut dashboard = Dashboard::open(config);
    select_dataset(&mut dashboard, path)?;
    let confirmation = dashboard.search.upload()?;

    let message = if confirmation.message.is_empty() {
        "Dataset uploaded.".to_string()
    } else {
        confirmation.message
    };
    println!("{} {}", "✓".green().bold(), message);
    Ok(())
}

/// Upload `dataset`, search for `timestamp`, and print the neighbours that
/// pass `filters`.
pub fn run_search_query(
    config: &GridsightConfig,
    dataset: &Path,
    timestamp: &str,
    filters: FilterForm,
    insights: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut dashboard = Dashboard::open(config);
    select_dataset(&mut dashboard, dataset)?;
    dashboard.search.upload()?;

    let result = dashboard.search.query(timestamp)?;
    dashboard.search.set_filters(filters);
    let shown = dashboard.search.filtered();

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "query_timestamp": result.query_timestamp,
            "elapsed_ms": result.elapsed_ms,
            "total": result.neighbours.len(),
            "neighbours": shown,
        }))?,
        OutputFormat::Table => print_search_table(&result, &shown),
    }

    if insights {
        print_insight(&dashboard.search.insights(dashboard.insights_config())?);
    }
    Ok(())
}

/// Append one reading to the search index.
pub fn run_search_add(config: &GridsightConfig, form: &BulbForm) -> Result<()> {
    let dashboard = Dashboard::open(config);
    let message = dashboard.search.add_bulb(form)?;
    println!("{} {}", "✓".green().bold(), message);
    Ok(())
}

fn select_dataset(dashboard: &mut Dashboard, path: &Path) -> Result<()> {
    let content =
        fs::read(path).with_context(|| format!("failed to read dataset {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset.csv".to_string());
    dashboard.search.select_file(name, content);
    Ok(())
}

fn print_search_table(result: &SearchResult, shown: &[NeighborRecord]) {
    println!(
        "{}",
        format!("Nearest readings to {}", result.query_timestamp)
            .bold()
            .cyan()
    );
    println!(
        "  {}",
        format!(
            "{} of {} shown, answered in {} ms",
            shown.len(),
            result.neighbours.len(),
            result.elapsed_ms
        )
        .dimmed()
    );
    println!();

    if shown.is_empty() {
        println!("{}", "No readings match the filters.".yellow());
        return;
    }

    let headers = [
        "Bulb", "Timestamp", "Power (W)", "Voltage (V)", "Temp (°C)", "Conditions", "Distance",
    ];
    let rows = shown
        .iter()
        .map(|r| {
            vec![
                r.bulb_number.to_string(),
                r.timestamp.clone(),
                r.power_consumption.to_string(),
                r.voltage_levels.to_string(),
                r.temperature.to_string(),
                r.environmental_conditions.clone(),
                r.distance.map(|d| d.to_string()).unwrap_or_default(),
            ]
        })
        .collect::<Vec<_>>();
    print_table(&headers.map(String::from), &rows);
}

// ---------------------------------------------------------------------------
// gridsight history
// ---------------------------------------------------------------------------

/// List a history log, newest first.
pub fn run_history_show(config: &GridsightConfig, log: &str, format: OutputFormat) -> Result<()> {
    let dashboard = Dashboard::open(config);
    let history = find_log(&dashboard, log)?;

    if format == OutputFormat::Json {
        return print_json(history.get());
    }

    println!(
        "{}",
        format!("{} ({} entries)", history.name(), history.len())
            .bold()
            .cyan()
    );
    if history.is_empty() {
        println!("{}", "No predictions logged yet.".yellow());
        return Ok(());
    }
    let (headers, rows) = history_rows(history.get());
    print_table(&headers, &rows);
    Ok(())
}

/// Clear a history log.
pub fn run_history_clear(config: &GridsightConfig, log: &str) -> Result<()> {
    let mut dashboard = Dashboard::open(config);
    let history = dashboard
        .history_mut(log)
        .with_context(|| format!("unknown log '{log}' (expected energy or fault)"))?;
    history.clear();
    println!("{} Cleared {}", "✓".green().bold(), history.name().bold());
    Ok(())
}

/// Print the inputs of row `index`, ready to pass back as `--set` overrides.
pub fn run_history_replay(
    config: &GridsightConfig,
    log: &str,
    index: usize,
    format: OutputFormat,
) -> Result<()> {
    let dashboard = Dashboard::open(config);
    let history = find_log(&dashboard, log)?;
    let Some(entry) = history.entry(index) else {
        bail!("{} has no entry {index} ({} entries)", history.name(), history.len());
    };
    let inputs = HistoryLog::select_entry(entry);

    match format {
        OutputFormat::Json => print_json(inputs)?,
        OutputFormat::Table => {
            for (name, value) in inputs {
                println!("  {:<28} {}", name.bold(), value);
            }
            let args = inputs
                .iter()
                .map(|(name, value)| shell_quote(&format!("{name}={value}")))
                .collect::<Vec<_>>()
                .join(" --set ");
            println!();
            println!("  {}", format!("--set {args}").dimmed());
        }
    }
    Ok(())
}

fn find_log<'a>(dashboard: &'a Dashboard, log: &str) -> Result<&'a HistoryLog> {
    dashboard
        .history(log)
        .with_context(|| format!("unknown log '{log}' (expected energy or fault)"))
}

/// Column headers (inputs then results, first-seen order) and one row per
/// entry.
fn history_rows(entries: &[LogEntry]) -> (Vec<String>, Vec<Vec<String>>) {
    let mut headers: Vec<String> = vec!["#".to_string()];
    for entry in entries {
        for name in entry.inputs.keys().chain(entry.results.keys()) {
            if !headers.contains(name) {
                headers.push(name.clone());
            }
        }
    }
    let rows = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            std::iter::once(i.to_string())
                .chain(headers[1..].iter().map(|name| {
                    entry
                        .field(name)
                        .map(ToString::to_string)
                        .unwrap_or_default()
                }))
                .collect()
        })
        .collect();
    (headers, rows)
}

// ---------------------------------------------------------------------------
// gridsight insights
// ---------------------------------------------------------------------------

/// Send a free-form prompt to the generative-text API.
pub fn run_insights(config: &GridsightConfig, prompt: &str) -> Result<()> {
    print_insight(&llm::generate_text(&config.insights, prompt));
    Ok(())
}

fn print_insight(text: &str) {
    println!();
    if llm::is_error(text) {
        println!("{}", text.yellow());
    } else {
        println!("{}", "Insights".bold().cyan());
        println!("{text}");
    }
}

// ---------------------------------------------------------------------------
// gridsight config
// ---------------------------------------------------------------------------

/// Show the effective configuration and where it came from.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective gridsight Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source(global_exists, "~/.gridsight/config.toml");
    print_source(project_exists, ".gridsight.toml");
    println!(
        "  {} {}",
        "·".dimmed(),
        "GRIDSIGHT_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(exists: bool, name: &str) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.gridsight/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!(
        "  {}",
        "Set [backend] url and [insights] api_key to get started.".dimmed()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a left-aligned table with a bold header and striped rows.
fn print_table(headers: &[String], rows: &[Vec<String>]) {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(col, h)| {
            rows.iter()
                .filter_map(|r| r.get(col))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let render = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{:<width$}", truncate(cell, width)))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("  {}", render(headers).bold());
    println!("  {}", "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    for (i, row) in rows.iter().enumerate() {
        print_striped(i, &format!("  {}", render(row.as_slice())));
    }
}

const MAX_COLUMN_WIDTH: usize = 24;

fn print_striped(i: usize, line: &str) {
    if i % 2 == 0 {
        println!("{line}");
    } else {
        println!("{}", line.dimmed());
    }
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

/// Quote an argument for a POSIX shell when it contains anything unusual.
fn shell_quote(arg: &str) -> String {
    if arg
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "=_-.:/".contains(c))
    {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
