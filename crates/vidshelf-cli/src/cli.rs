//! Command-line client for browsing and curating a Vidshelf library.

use std::path::PathBuf;
use std::rc::Rc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{Instrument, debug};
use uuid::Uuid;
use vidshelf_config::{ClientConfig, ClientConfigPatch, ConfigLoader, validate};
use vidshelf_telemetry::{LogFormat, LoggingConfig, build_sha, command_span, init_logging};
use vidshelf_ui::core::filters::{TagMode, WatchFilter};

use crate::client::{AppContext, CliError, CliResult, ReqwestTransport};
use crate::commands::channels::{handle_channels, handle_subscribe, handle_unsubscribe};
use crate::commands::import::{handle_import, handle_quota};
use crate::commands::tags::{handle_tag_assign, handle_tag_create, handle_tag_delete, handle_tag_list};
use crate::commands::videos::{handle_videos, handle_watch};

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    install_logging(&cli);
    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();

    let span = command_span(command_name, &trace_id);

    let result = match build_context(&cli, &trace_id) {
        Ok(ctx) => dispatch(&ctx, cli.command).instrument(span).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn install_logging(cli: &Cli) {
    let config = LoggingConfig {
        level: &cli.log_level,
        format: LogFormat::from_name(&cli.log_format),
        build_sha: build_sha(),
    };
    if let Err(err) = init_logging(&config) {
        eprintln!("warning: {err}");
    }
}

/// Layer CLI flags over the file and environment configuration.
pub(crate) fn load_config(cli: &Cli) -> CliResult<ClientConfig> {
    let loader = ConfigLoader::from_env();
    let loader = match &cli.config {
        Some(path) => loader.with_file(path),
        None => loader,
    };
    let mut config = loader
        .load()
        .map_err(|err| CliError::validation(err.to_string()))?;
    config.apply(ClientConfigPatch {
        api_base_url: cli.api_url.clone(),
        api_key: cli.api_key.clone(),
        page_size: cli.page_size,
        request_timeout_secs: cli.timeout,
        ..ClientConfigPatch::default()
    });
    validate(&config).map_err(|err| CliError::validation(err.to_string()))?;
    debug!(base_url = config.base_url(), page_size = config.page_size, "configuration loaded");
    Ok(config)
}

fn build_context(cli: &Cli, trace_id: &str) -> CliResult<AppContext> {
    let config = load_config(cli)?;
    let transport = ReqwestTransport::new(config.request_timeout_secs, trace_id)?;
    Ok(AppContext::new(config, Rc::new(transport), cli.output))
}

pub(crate) async fn dispatch(ctx: &AppContext, command: Command) -> CliResult<()> {
    match command {
        Command::Videos(args) => handle_videos(ctx, args).await,
        Command::Channels(args) => handle_channels(ctx, args).await,
        Command::Tags(tags) => match tags {
            TagCommand::List => handle_tag_list(ctx).await,
            TagCommand::Create(args) => handle_tag_create(ctx, args).await,
            TagCommand::Delete(args) => handle_tag_delete(ctx, args).await,
        },
        Command::Tag(args) => handle_tag_assign(ctx, args).await,
        Command::Watch(args) => handle_watch(ctx, args).await,
        Command::Subscribe(args) => handle_subscribe(ctx, args).await,
        Command::Unsubscribe(args) => handle_unsubscribe(ctx, args).await,
        Command::Import(args) => handle_import(ctx, args).await,
        Command::Quota => handle_quota(ctx).await,
    }
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Videos(_) => "videos",
        Command::Channels(_) => "channels",
        Command::Tags(TagCommand::List) => "tags_list",
        Command::Tags(TagCommand::Create(_)) => "tags_create",
        Command::Tags(TagCommand::Delete(_)) => "tags_delete",
        Command::Tag(_) => "tag",
        Command::Watch(_) => "watch",
        Command::Subscribe(_) => "subscribe",
        Command::Unsubscribe(_) => "unsubscribe",
        Command::Import(_) => "import",
        Command::Quota => "quota",
    }
}

#[derive(Parser)]
#[command(name = "vidshelf", about = "Browse and curate a Vidshelf YouTube library")]
pub(crate) struct Cli {
    #[arg(long, global = true, help = "Backend base URL (overrides VIDSHELF_API_URL)")]
    api_url: Option<String>,
    #[arg(long, global = true, help = "API key (overrides VIDSHELF_API_KEY)")]
    api_key: Option<String>,
    #[arg(long, global = true, help = "JSON configuration file (overrides VIDSHELF_CONFIG)")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Items per page")]
    page_size: Option<u32>,
    #[arg(long, global = true, help = "HTTP timeout in seconds")]
    timeout: Option<u64>,
    #[arg(
        long,
        global = true,
        env = "VIDSHELF_LOG_LEVEL",
        default_value = "warn"
    )]
    log_level: String,
    #[arg(
        long,
        global = true,
        env = "VIDSHELF_LOG_FORMAT",
        default_value = "pretty"
    )]
    log_format: String,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// List videos.
    Videos(VideoListArgs),
    /// List subscribed or available channels.
    Channels(ChannelListArgs),
    /// Manage the tag catalogue.
    #[command(subcommand)]
    Tags(TagCommand),
    /// Replace the tags on a video or channel.
    Tag(TagAssignArgs),
    /// Mark a video watched or unwatched.
    Watch(WatchArgs),
    /// Subscribe to a channel.
    Subscribe(ChannelArgs),
    /// Unsubscribe from a channel.
    Unsubscribe(ChannelArgs),
    /// Import YouTube subscriptions.
    Import(ImportArgs),
    /// Show today's YouTube API quota usage.
    Quota,
}

#[derive(Subcommand)]
pub(crate) enum TagCommand {
    List,
    Create(TagCreateArgs),
    Delete(TagDeleteArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct FilterArgs {
    #[arg(long, short, help = "Free-text search")]
    pub(crate) search: Option<String>,
    #[arg(long = "tag", value_name = "TAG", help = "Filter by tag (repeatable)")]
    pub(crate) tags: Vec<String>,
    #[arg(long, value_enum, default_value_t = TagModeArg::Any)]
    pub(crate) tag_mode: TagModeArg,
    #[arg(long, default_value_t = 1, help = "Number of pages to load")]
    pub(crate) pages: usize,
}

#[derive(Args, Debug)]
pub(crate) struct VideoListArgs {
    #[command(flatten)]
    pub(crate) filter: FilterArgs,
    #[arg(long = "watched", value_enum, default_value_t = WatchArg::All)]
    pub(crate) watch: WatchArg,
}

#[derive(Args, Debug)]
pub(crate) struct ChannelListArgs {
    #[command(flatten)]
    pub(crate) filter: FilterArgs,
    #[arg(long, help = "List channels you are not subscribed to")]
    pub(crate) available: bool,
}

#[derive(Args, Debug)]
pub(crate) struct TagCreateArgs {
    pub(crate) name: String,
    #[arg(long, help = "Display colour as #rrggbb")]
    pub(crate) colour: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct TagDeleteArgs {
    pub(crate) id: u64,
}

#[derive(Args, Debug)]
pub(crate) struct TagAssignArgs {
    #[arg(value_enum)]
    pub(crate) target: TagTarget,
    pub(crate) id: String,
    #[arg(value_delimiter = ',', help = "Tags to set; none clears every tag")]
    pub(crate) tags: Vec<String>,
}

#[derive(Args, Debug)]
pub(crate) struct WatchArgs {
    pub(crate) video_id: String,
    #[arg(long, help = "Mark as unwatched instead")]
    pub(crate) unwatched: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ChannelArgs {
    pub(crate) channel_id: String,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    #[arg(long, help = "Skip the local quota check")]
    pub(crate) force: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum TagModeArg {
    #[default]
    Any,
    All,
    Except,
}

impl From<TagModeArg> for TagMode {
    fn from(value: TagModeArg) -> Self {
        match value {
            TagModeArg::Any => Self::Any,
            TagModeArg::All => Self::All,
            TagModeArg::Except => Self::Except,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum WatchArg {
    #[default]
    All,
    Watched,
    Unwatched,
}

impl From<WatchArg> for WatchFilter {
    fn from(value: WatchArg) -> Self {
        match value {
            WatchArg::All => Self::All,
            WatchArg::Watched => Self::Watched,
            WatchArg::Unwatched => Self::Unwatched,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum TagTarget {
    Video,
    Channel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("vidshelf").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn video_filters_parse() {
        let cli = parse(&[
            "videos", "--tag", "music", "--tag", "live", "--tag-mode", "all", "--watched",
            "unwatched", "--pages", "3",
        ]);
        let Command::Videos(args) = cli.command else {
            panic!("expected videos command");
        };
        assert_eq!(args.filter.tags, ["music", "live"]);
        assert_eq!(TagMode::from(args.filter.tag_mode), TagMode::All);
        assert_eq!(WatchFilter::from(args.watch), WatchFilter::Unwatched);
        assert_eq!(args.filter.pages, 3);
    }

    #[test]
    fn tag_assignment_splits_commas() {
        let cli = parse(&["tag", "channel", "UC1", "music,news", "--output", "json"]);
        assert_eq!(cli.output, OutputFormat::Json);
        let Command::Tag(args) = cli.command else {
            panic!("expected tag command");
        };
        assert_eq!(args.target, TagTarget::Channel);
        assert_eq!(args.tags, ["music", "news"]);
        assert_eq!(command_label(&Command::Quota), "quota");
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"api_base_url": "http://file.example", "page_size": 10}}"#).unwrap();
        let path = file.path().to_string_lossy().to_string();
        let cli = parse(&["--config", &path, "--page-size", "50", "quota"]);

        let config = load_config(&cli).unwrap();

        assert_eq!(config.page_size, 50);
        assert_eq!(config.api_base_url, "http://file.example");
    }

    #[test]
    fn invalid_override_is_a_validation_error() {
        let cli = parse(&["--page-size", "0", "quota"]);
        let err = load_config(&cli).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
