//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use serde::Serialize;
use serde_json::json;
use vidshelf_api_models::{Channel, ImportSummary, QuotaState, StatusPayload, Tag, Video};
use vidshelf_ui::core::cache::CacheEntry;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

fn list_json<T: Serialize>(entry: &CacheEntry<T>) -> serde_json::Value {
    let results: Vec<&T> = entry.items().collect();
    json!({
        "count": entry.total_count(),
        "pages_loaded": entry.pages_loaded(),
        "next": entry.next_cursor(),
        "results": results,
    })
}

fn print_footer<T>(entry: &CacheEntry<T>) {
    let shown = entry.items().count();
    let total = entry.total_count().unwrap_or(0);
    println!("{shown} of {total} shown");
    if entry.has_more() {
        println!("more available: pass --pages {}", entry.pages_loaded() + 1);
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

pub(crate) fn render_videos(entry: &CacheEntry<Video>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&list_json(entry))?,
        OutputFormat::Table => {
            println!("{:<11} {:<7} {:<24} TITLE", "ID", "WATCHED", "TAGS");
            for video in entry.items() {
                println!(
                    "{:<11} {:<7} {:<24} {}",
                    video.id,
                    if video.is_watched { "yes" } else { "no" },
                    truncate(&video.tags.join(","), 24),
                    truncate(&video.title, 60)
                );
            }
            print_footer(entry);
        }
    }
    Ok(())
}

pub(crate) fn render_channels(entry: &CacheEntry<Channel>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&list_json(entry))?,
        OutputFormat::Table => {
            println!("{:<24} {:<10} {:>6} {:<24} TITLE", "ID", "SUBSCRIBED", "VIDEOS", "TAGS");
            for channel in entry.items() {
                println!(
                    "{:<24} {:<10} {:>6} {:<24} {}",
                    channel.id,
                    if channel.is_subscribed { "yes" } else { "no" },
                    channel
                        .video_count
                        .map_or_else(|| "-".to_string(), |count| count.to_string()),
                    truncate(&channel.tags.join(","), 24),
                    truncate(&channel.title, 48)
                );
            }
            print_footer(entry);
        }
    }
    Ok(())
}

pub(crate) fn render_tags(entry: &CacheEntry<Tag>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&list_json(entry))?,
        OutputFormat::Table => {
            println!("{:>5} {:<9} {:>8} {:>6} NAME", "ID", "COLOUR", "CHANNELS", "VIDEOS");
            for tag in entry.items() {
                println!(
                    "{:>5} {:<9} {:>8} {:>6} {}",
                    tag.id,
                    tag.colour.as_deref().unwrap_or("-"),
                    tag.channel_count,
                    tag.video_count,
                    tag.name
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn render_tag(tag: &Tag, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(tag),
        OutputFormat::Table => {
            println!("created tag {} (id: {})", tag.name, tag.id);
            Ok(())
        }
    }
}

pub(crate) fn render_quota(quota: &QuotaState, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(quota),
        OutputFormat::Table => {
            println!("used: {} / {}", quota.used, quota.daily_limit);
            println!("remaining: {}", quota.remaining);
            println!("usage: {:.1}% ({:?})", quota.percentage_used, quota.status);
            println!("import allowed: {}", if quota.can_import() { "yes" } else { "no" });
            Ok(())
        }
    }
}

pub(crate) fn render_import(summary: &ImportSummary, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(summary),
        OutputFormat::Table => {
            println!(
                "imported {} of {} subscriptions ({} skipped)",
                summary.imported, summary.total, summary.skipped
            );
            Ok(())
        }
    }
}

pub(crate) fn render_status(action: &str, status: &StatusPayload, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(status),
        OutputFormat::Table => {
            let detail = status
                .message
                .as_deref()
                .or(status.status.as_deref())
                .unwrap_or("ok");
            println!("{action}: {detail}");
            Ok(())
        }
    }
}
