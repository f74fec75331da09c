use std::process;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;

use apod::api::{self, NasaClient};
use apod::cache;
use apod::config::AppPaths;
use apod::errors::{ApodError, Result};
use apod::hash::short_digest;
use apod::storage::ApodStore;
use apod::storage::models::ApodRecord;
use apod::wallpaper;

#[derive(Parser)]
#[command(name = "apod", version, about = "NASA Astronomy Picture of the Day cache")]
struct Cli {
    /// Output results as JSON
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the APOD for a date into the cache
    Fetch {
        /// APOD date (YYYY-MM-DD); defaults to today
        date: Option<String>,

        /// Also set the cached image as the desktop background
        #[arg(long)]
        set_desktop: bool,
    },

    /// Show a cached APOD by ID
    Info {
        /// Record ID
        id: i64,
    },

    /// List the titles of all cached APODs
    List,

    /// Set a cached APOD as the desktop background
    SetDesktop {
        /// Record ID
        id: i64,
    },

    /// List image files that no cache record references
    Orphans,

    /// Interactive viewer
    Tui,
}

#[derive(Serialize)]
struct StatusResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
}

fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        if json {
            eprintln!("{}", serde_json::json!({"error": e.to_string()}));
        } else {
            eprintln!("error: {}", e);
        }
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = AppPaths::new();
    let json = cli.json;

    match cli.command {
        None | Some(Commands::List) => cmd_list(&paths, json),
        Some(Commands::Fetch { date, set_desktop }) => {
            cmd_fetch(&paths, date.as_deref(), set_desktop, json)
        }
        Some(Commands::Info { id }) => cmd_info(&paths, id, json),
        Some(Commands::SetDesktop { id }) => cmd_set_desktop(&paths, id, json),
        Some(Commands::Orphans) => cmd_orphans(&paths, json),
        Some(Commands::Tui) => apod::tui::run(&paths),
    }
}

/// Date validation happens here, at the CLI boundary; the orchestrator
/// never sees an out-of-range date.
fn parse_apod_date(arg: Option<&str>) -> Result<NaiveDate> {
    let date = match arg {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| ApodError::InvalidDate(format!("\"{}\" (use YYYY-MM-DD)", s)))?,
        None => Local::now().date_naive(),
    };
    api::validate_date(date)?;
    Ok(date)
}

fn cmd_fetch(paths: &AppPaths, date: Option<&str>, set_desktop: bool, json: bool) -> Result<()> {
    let date = parse_apod_date(date)?;
    let storage = cache::init_cache(paths)?;
    let client = NasaClient::from_env();

    let id = cache::add_to_cache(&client, &storage, &paths.images_dir, date)?;
    let record = storage.get_by_id(id)?;

    if set_desktop {
        wallpaper::set_desktop_background(std::path::Path::new(&record.file_path))?;
    }

    if json {
        println!(
            "{}",
            serde_json::to_string(&StatusResponse {
                success: true,
                message: format!("Cached APOD {} ({})", date, record.title),
                id: Some(id),
            })
            .unwrap()
        );
    } else {
        println!("APOD {}: {}", date, record.title);
        println!("Cached as record #{} at {}", id, record.file_path);
        if set_desktop {
            println!("Desktop background updated.");
        }
    }
    Ok(())
}

fn cmd_info(paths: &AppPaths, id: i64, json: bool) -> Result<()> {
    let storage = cache::init_cache(paths)?;
    let record = storage.get_by_id(id)?;

    if json {
        println!("{}", serde_json::to_string(&record).unwrap());
        return Ok(());
    }

    print_record(&record);
    Ok(())
}

fn cmd_list(paths: &AppPaths, json: bool) -> Result<()> {
    let storage = cache::init_cache(paths)?;
    let titles = storage.list_titles()?;

    if json {
        println!("{}", serde_json::to_string(&titles).unwrap());
        return Ok(());
    }

    if titles.is_empty() {
        println!("No cached images. Run `apod fetch` to download one.");
        return Ok(());
    }

    for title in &titles {
        println!("{}", title);
    }
    Ok(())
}

fn cmd_set_desktop(paths: &AppPaths, id: i64, json: bool) -> Result<()> {
    let storage = cache::init_cache(paths)?;
    let record = storage.get_by_id(id)?;
    wallpaper::set_desktop_background(std::path::Path::new(&record.file_path))?;

    let message = format!("Set \"{}\" as the desktop background.", record.title);
    if json {
        println!(
            "{}",
            serde_json::to_string(&StatusResponse {
                success: true,
                message,
                id: Some(id),
            })
            .unwrap()
        );
    } else {
        println!("{}", message);
    }
    Ok(())
}

fn cmd_orphans(paths: &AppPaths, json: bool) -> Result<()> {
    let storage = cache::init_cache(paths)?;
    let orphans = cache::find_orphans(&storage, &paths.images_dir)?;

    if json {
        let paths: Vec<String> = orphans
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        println!("{}", serde_json::to_string(&paths).unwrap());
        return Ok(());
    }

    if orphans.is_empty() {
        println!("No orphaned files.");
        return Ok(());
    }

    for path in &orphans {
        println!("{}", path.display());
    }
    Ok(())
}

fn print_record(record: &ApodRecord) {
    println!("ID:      {}", record.id);
    println!("Title:   {}", record.title);
    println!("File:    {}", record.file_path);
    println!("SHA256:  {}", short_digest(&record.sha256));
    println!("─────────────────────────");
    println!("{}", record.explanation);
}
