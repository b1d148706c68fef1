//! Command handlers grouped by resource.

pub(crate) mod channels;
pub(crate) mod import;
pub(crate) mod tags;
pub(crate) mod videos;

use serde::de::DeserializeOwned;
use vidshelf_ui::core::cache::{CacheEntry, LoadMoreOutcome};
use vidshelf_ui::core::filters::{TagSet, validate_tag_name};
use vidshelf_ui::features::gallery::{ListView, RestoreOutcome, TriggerOutcome};

use crate::client::{CliError, CliResult};

/// Press "load more" until `pages` pages are loaded or the list ends.
pub(crate) async fn load_pages<T>(
    list: &ListView<T>,
    opened: RestoreOutcome,
    pages: usize,
) -> CliResult<CacheEntry<T>>
where
    T: Clone + DeserializeOwned,
{
    if let RestoreOutcome::Failed(error) = opened {
        return Err(error.into());
    }
    for _ in 1..pages {
        match list.on_load_more_clicked().await {
            TriggerOutcome::Loaded(LoadMoreOutcome::Appended) => {}
            TriggerOutcome::Loaded(LoadMoreOutcome::Failed(error)) => return Err(error.into()),
            _ => break,
        }
    }
    list.entry()
        .ok_or_else(|| CliError::validation("no list is active"))
}

pub(crate) fn require_pages(pages: usize) -> CliResult<()> {
    if pages == 0 {
        return Err(CliError::validation("--pages must be at least 1"));
    }
    Ok(())
}

/// Validate and de-duplicate tag names given on the command line.
pub(crate) fn tag_set(raw: &[String]) -> CliResult<TagSet> {
    raw.iter()
        .map(|tag| validate_tag_name(tag).map_err(|err| CliError::validation(err.to_string())))
        .collect()
}
