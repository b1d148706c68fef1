use vidshelf_ui::core::filters::VideoFilters;

use crate::cli::{VideoListArgs, WatchArgs};
use crate::client::{AppContext, CliResult};
use crate::commands::{load_pages, require_pages, tag_set};
use crate::output::{render_status, render_videos};

pub(crate) async fn handle_videos(ctx: &AppContext, args: VideoListArgs) -> CliResult<()> {
    require_pages(args.filter.pages)?;
    let filters = VideoFilters {
        watch: args.watch.into(),
        search: args.filter.search.unwrap_or_default(),
        selected_tags: tag_set(&args.filter.tags)?,
        tag_mode: args.filter.tag_mode.into(),
        ..VideoFilters::default()
    };
    let opened = ctx.gallery.open_videos(&filters).await;
    let entry = load_pages(ctx.gallery.videos(), opened, args.filter.pages).await?;
    render_videos(&entry, ctx.output)
}

pub(crate) async fn handle_watch(ctx: &AppContext, args: WatchArgs) -> CliResult<()> {
    ctx.require_credentials()?;
    let is_watched = !args.unwatched;
    let status = ctx
        .gallery
        .actions()
        .set_watched(&args.video_id, is_watched)
        .await?;
    let action = if is_watched { "marked watched" } else { "marked unwatched" };
    render_status(action, &status, ctx.output)
}
