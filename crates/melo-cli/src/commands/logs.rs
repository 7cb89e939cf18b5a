use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use melo_logging::{
    format_size, LogEntry, LogFileManager, LogLevel, LogQuery, LoggingConfig, QueryResult,
};
use std::path::{Path, PathBuf};

use crate::{LogsCommands, QueryArgs};

pub fn execute(dir: Option<PathBuf>, config_path: &Path, command: LogsCommands) -> Result<()> {
    let mut config = LoggingConfig::load(config_path)?.with_env()?;
    if let Some(dir) = dir {
        config.rotation.directory = dir;
    }

    let manager = LogFileManager::new(config.rotation);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async {
        match command {
            LogsCommands::Query(args) => query(&manager, args).await,
            LogsCommands::Stats => stats(&manager).await,
            LogsCommands::Rotate => rotate(&manager).await,
            LogsCommands::Cleanup => cleanup(&manager).await,
        }
    })
}

async fn query(manager: &LogFileManager, args: QueryArgs) -> Result<()> {
    let json = args.json;
    let query = build_query(args)?;
    let result = manager.query(&query).await?;

    if json {
        for entry in &result.entries {
            println!("{}", entry.to_json_line()?);
        }
        return Ok(());
    }

    if result.entries.is_empty() {
        println!("{}", empty_page_message(&result).yellow());
        return Ok(());
    }

    for entry in &result.entries {
        println!("{}", format_entry(entry));
    }

    println!();
    println!(
        "Showing {}-{} of {}",
        result.offset + 1,
        result.offset + result.entries.len(),
        result.total
    );
    if result.has_more() {
        println!("{}", "More results available; use --offset to page".dimmed());
    }

    Ok(())
}

/// What to say when a page comes back empty
fn empty_page_message(result: &QueryResult) -> String {
    if result.total == 0 {
        "No matching log entries".to_string()
    } else {
        format!(
            "No entries at offset {}; {} matching entries in total",
            result.offset, result.total
        )
    }
}

async fn stats(manager: &LogFileManager) -> Result<()> {
    let stats = manager.stats().await?;

    println!("{}", "Log statistics".green().bold());
    println!();
    println!("Directory: {}", manager.directory().display().to_string().cyan());
    println!("Files:     {} ({})", stats.file_count, format_size(stats.total_size_bytes));
    println!("Entries:   {}", stats.total_entries);

    for level in [LogLevel::Debug, LogLevel::Info, LogLevel::Warn, LogLevel::Error] {
        println!("  {:<7} {}", level_label(level), stats.count(level));
    }

    if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
        println!("Range:     {} .. {}", oldest.to_rfc3339(), newest.to_rfc3339());
    }

    if !stats.top_paths.is_empty() {
        println!();
        println!("{}", "Top paths".bold());
        for item in &stats.top_paths {
            println!("  {:>6}  {}", item.count, item.value);
        }
    }

    if !stats.top_errors.is_empty() {
        println!();
        println!("{}", "Top errors".bold());
        for item in &stats.top_errors {
            println!("  {:>6}  {}", item.count, item.value.red());
        }
    }

    Ok(())
}

async fn rotate(manager: &LogFileManager) -> Result<()> {
    let rotated = manager.rotate().await?;

    if rotated.is_empty() {
        println!("Nothing to rotate (limit {})", format_size(manager.config().max_size));
    } else {
        for path in &rotated {
            println!("{} {}", "✓ rotated".green(), path.display());
        }
    }

    Ok(())
}

async fn cleanup(manager: &LogFileManager) -> Result<()> {
    let removed = manager.cleanup().await?;

    if removed.is_empty() {
        println!("Nothing to remove (keeping {} files)", manager.config().max_files);
    } else {
        for path in &removed {
            println!("{} {}", "✗ removed".yellow(), path.display());
        }
    }

    Ok(())
}

fn build_query(args: QueryArgs) -> Result<LogQuery> {
    let level = args.level.as_deref().map(str::parse::<LogLevel>).transpose()?;

    Ok(LogQuery {
        level,
        correlation_id: args.correlation_id,
        start_time: args.since.as_deref().map(parse_time).transpose()?,
        end_time: args.until.as_deref().map(parse_time).transpose()?,
        search: args.search,
        user_id: args.user,
        path: args.path,
        status_code: args.status,
        offset: Some(args.offset),
        limit: Some(args.limit),
    })
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp '{}', expected RFC 3339", value))
}

fn level_label(level: LogLevel) -> ColoredString {
    let label = level.as_str().to_uppercase();
    match level {
        LogLevel::Debug => label.dimmed(),
        LogLevel::Info => label.green(),
        LogLevel::Warn => label.yellow(),
        LogLevel::Error => label.red().bold(),
    }
}

fn format_entry(entry: &LogEntry) -> String {
    let mut line = format!(
        "{} {:<5} {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        level_label(entry.level),
        entry.message
    );

    if let Some(id) = &entry.correlation_id {
        line.push_str(&format!(" [{}]", id).dimmed().to_string());
    }
    if let Some(error) = &entry.error {
        line.push_str(&format!("\n    {}: {}", error.name, error.message).red().to_string());
    }

    line
}
