//! Cachelytics - LLM Gateway Cache Analytics Tool
//!
//! Reads cache activity captured from an LLM gateway, aggregates it into
//! per-call-type series and cache hit metrics, and reports the health of the
//! gateway's cache backend.

mod config;
mod display;
mod export;
mod watcher;

use anyhow::Result;
use cachelytics::controller::{DashboardController, DashboardView, check_health};
use cachelytics::error::CachelyticsError;
use cachelytics::filters::{DateRange, FilterSelection, parse_date};
use cachelytics::source::{CapturedHealthProbe, ExportFileSource, FailedHealthProbe};
use chrono::Local;
use clap::{Parser, Subcommand};
use config::{Config, OutputFormat};
use display::{
    display_activity_report_enhanced, display_activity_report_table, display_facets,
    display_health_result, display_json, print_error, print_info, print_warning,
};
use export::{export_series_to_csv, export_summary_to_csv};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use watcher::ActivityWatcher;

#[derive(Parser)]
#[command(name = "cachelytics")]
#[command(about = "LLM gateway cache analytics - cache hits, cached tokens and cache backend health")]
#[command(version)]
#[command(
    long_about = "Cachelytics reads cache activity captured from an LLM gateway and reports cache hits,
cached completion tokens and the cache hit ratio per call type.

EXAMPLES:
  cachelytics                              # Last 7 days, all keys and models
  cachelytics --since 20240501 activity    # From May 1, 2024
  cachelytics activity --api-key sk-abc    # Only one API key
  cachelytics --json activity              # Series and summary as JSON
  cachelytics facets                       # Keys, models and call types in the data
  cachelytics health --response ping.json  # Normalize a captured cache ping
  cachelytics export -o report             # report.series.csv, report.summary.csv
  cachelytics watch                        # Re-render when captures change

LOGGING:
  Set CACHELYTICS_LOG (e.g. CACHELYTICS_LOG=debug) to see diagnostics on stderr."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(
        short,
        long,
        value_name = "DATE",
        help = "Window start (YYYYMMDD or YYYY-MM-DD)"
    )]
    since: Option<String>,

    #[arg(
        short,
        long,
        value_name = "DATE",
        help = "Window end (YYYYMMDD or YYYY-MM-DD)"
    )]
    until: Option<String>,

    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Captured activity export",
        long_help = "Captured cache activity: a .json array, a .jsonl file, or a directory of\nYYYY-MM-DD.json daily captures. Defaults to the configured data path."
    )]
    path: Option<PathBuf>,

    #[arg(short, long, help = "Output in JSON format")]
    json: bool,

    #[arg(short, long, help = "Only today's activity")]
    today: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show cache activity by call type (default)")]
    Activity {
        #[arg(long = "api-key", value_name = "KEY", help = "Only these API keys (repeatable)")]
        api_keys: Vec<String>,
        #[arg(long = "model", value_name = "MODEL", help = "Only these models (repeatable)")]
        models: Vec<String>,
        #[arg(long, help = "Table only, no summary card or bars")]
        classic: bool,
    },
    #[command(about = "List API keys, models and call types present in the data")]
    Facets,
    #[command(about = "Show cache backend health")]
    Health {
        #[arg(long, value_name = "FILE", help = "Captured cache ping response")]
        response: Option<PathBuf>,
        #[arg(
            long,
            value_name = "TEXT",
            conflicts_with = "response",
            help = "Error text raised by a failed health check"
        )]
        error: Option<String>,
        #[arg(long, help = "Exit with status 1 when the check failed")]
        fail_on_error: bool,
    },
    #[command(about = "Export series and summary to CSV")]
    Export {
        #[arg(long, help = "Export per-call-type series")]
        series: bool,
        #[arg(long, help = "Export summary metrics")]
        summary: bool,
        #[arg(long = "api-key", value_name = "KEY", help = "Only these API keys (repeatable)")]
        api_keys: Vec<String>,
        #[arg(long = "model", value_name = "MODEL", help = "Only these models (repeatable)")]
        models: Vec<String>,
        #[arg(short, long, help = "Base path for output files (without extension)")]
        output: Option<PathBuf>,
    },
    #[command(about = "Re-render cache activity when captures change")]
    Watch,
    #[command(about = "Manage configuration")]
    Config {
        #[arg(long, help = "Show current configuration")]
        show: bool,
        #[arg(long, help = "Reset to default configuration")]
        reset: bool,
        #[arg(long, value_name = "PATH", help = "Set captured activity path")]
        set_path: Option<PathBuf>,
    },
}

fn main() {
    if let Err(e) = run() {
        match e.downcast_ref::<CachelyticsError>() {
            Some(err) => print_error(&err.detailed_message()),
            None => print_error(&format!("{:#}", e)),
        }
        std::process::exit(1);
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_env("CACHELYTICS_LOG")
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load().unwrap_or_else(|e| {
        print_warning(&format!("{:#}; using default configuration", e));
        Config::default()
    });
    init_logging(&config);

    if let Some(Commands::Config {
        show,
        reset,
        set_path,
    }) = &cli.command
    {
        return handle_config_command(&mut config, *show, *reset, set_path.clone());
    }

    if let Some(Commands::Health {
        response,
        error,
        fail_on_error,
    }) = &cli.command
    {
        return handle_health_command(
            &config,
            response.clone(),
            error.clone(),
            *fail_on_error,
            cli.json,
        );
    }

    let data_path = cli.path.clone().unwrap_or_else(|| config.get_data_path());
    let range = resolve_date_range(&cli, &config)?;
    let mut controller = DashboardController::new(
        ExportFileSource::new(data_path.clone()),
        FilterSelection::new(range),
    );
    if let Some(Commands::Activity {
        api_keys, models, ..
    })
    | Some(Commands::Export {
        api_keys, models, ..
    }) = &cli.command
    {
        controller.select_api_keys(api_keys.iter().cloned());
        controller.select_models(models.iter().cloned());
    }

    if let Some(Commands::Watch) = &cli.command {
        let interval = Duration::from_secs(config.watch_interval_seconds.max(1));
        let mut watcher = ActivityWatcher::new(controller, interval)?;
        return watcher.watch(&data_path);
    }

    controller.refresh()?;
    let view = controller.view();

    match &cli.command {
        Some(Commands::Facets) => {
            if cli.json {
                display_json(&view.facets);
            } else {
                display_facets(&view.facets);
            }
            Ok(())
        }
        Some(Commands::Export {
            series,
            summary,
            output,
            ..
        }) => {
            let (series, summary) = if !series && !summary {
                (true, true)
            } else {
                (*series, *summary)
            };
            let base_path = output
                .clone()
                .unwrap_or_else(|| config.get_export_directory().join("cachelytics_export"));

            if series {
                let path = base_path.with_extension("series.csv");
                export_series_to_csv(&view.report, &path)?;
                print_info(&format!("Series exported to: {}", path.display()));
            }
            if summary {
                let path = base_path.with_extension("summary.csv");
                export_summary_to_csv(&view.report, &path)?;
                print_info(&format!("Summary exported to: {}", path.display()));
            }
            Ok(())
        }
        Some(Commands::Activity { classic, .. }) => {
            render_activity(&view, controller.filter(), &config, cli.json, *classic);
            Ok(())
        }
        _ => {
            render_activity(&view, controller.filter(), &config, cli.json, false);
            Ok(())
        }
    }
}

fn resolve_date_range(cli: &Cli, config: &Config) -> Result<DateRange> {
    if cli.today {
        let today = Local::now().date_naive();
        return Ok(DateRange::new(today, today)?);
    }

    let default_range = DateRange::last_days(config.default_range_days);
    let since = match &cli.since {
        Some(s) => parse_date(s)?,
        None => default_range.start_date(),
    };
    let until = match &cli.until {
        Some(u) => parse_date(u)?,
        None => default_range.end_date(),
    };

    Ok(DateRange::new(since, until)?)
}

fn render_activity(
    view: &DashboardView,
    filter: &FilterSelection,
    config: &Config,
    json: bool,
    classic: bool,
) {
    if json || config.default_output_format == OutputFormat::Json {
        display_json(view);
        return;
    }

    if view.report.series.is_empty() {
        print_warning("No cache activity found for the specified criteria");
    }

    if classic || config.default_output_format == OutputFormat::Table {
        display_activity_report_table(&view.report);
    } else {
        display_activity_report_enhanced(view, &filter.date_range);
    }
}

fn handle_health_command(
    config: &Config,
    response: Option<PathBuf>,
    error: Option<String>,
    fail_on_error: bool,
    json: bool,
) -> Result<()> {
    let result = if let Some(message) = error {
        check_health(&FailedHealthProbe::new(message))
    } else {
        let path = response
            .or_else(|| config.health_response_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No cache ping response given\nHint: pass --response FILE or --error TEXT, or set health_response_path in the config file"
                )
            })?;
        check_health(&CapturedHealthProbe::new(path))
    };

    if json {
        display_json(&result);
    } else {
        display_health_result(&result);
    }

    if fail_on_error && !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn handle_config_command(
    config: &mut Config,
    show: bool,
    reset: bool,
    set_path: Option<PathBuf>,
) -> Result<()> {
    if reset {
        *config = Config::default();
        config.save()?;
        print_info("Configuration reset to defaults");
        return Ok(());
    }

    if let Some(path) = set_path {
        config.set_data_path(path.clone());
        config.save()?;
        print_info(&format!("Data path set to: {}", path.display()));
        return Ok(());
    }

    if show {
        println!("Current Configuration:");
        println!("Data Path: {:?}", config.data_path);
        println!("Health Response Path: {:?}", config.health_response_path);
        println!("Default Output Format: {:?}", config.default_output_format);
        println!("Default Range: {} days", config.default_range_days);
        println!("Watch Interval: {}s", config.watch_interval_seconds);
        println!("Export Directory: {:?}", config.export_directory);
        println!("Log Level: {}", config.log_level);
        println!("Config File: {:?}", Config::config_path()?);
    }

    Ok(())
}
