use vidshelf_ui::core::filters::{FilterState, Scope};

use crate::cli::{ChannelArgs, ChannelListArgs};
use crate::client::{AppContext, CliResult};
use crate::commands::{load_pages, require_pages, tag_set};
use crate::output::{render_channels, render_status};

pub(crate) async fn handle_channels(ctx: &AppContext, args: ChannelListArgs) -> CliResult<()> {
    require_pages(args.filter.pages)?;
    let scope = if args.available {
        Scope::Available
    } else {
        Scope::Subscribed
    };
    let mut state = FilterState::new(scope);
    state.selected_tags = tag_set(&args.filter.tags)?;
    state.tag_mode = args.filter.tag_mode.into();
    state.search = args.filter.search.unwrap_or_default();

    let opened = ctx.gallery.open_channels(&state).await;
    let entry = load_pages(ctx.gallery.channels(), opened, args.filter.pages).await?;
    render_channels(&entry, ctx.output)
}

pub(crate) async fn handle_subscribe(ctx: &AppContext, args: ChannelArgs) -> CliResult<()> {
    ctx.require_credentials()?;
    let status = ctx.gallery.actions().subscribe(&args.channel_id).await?;
    render_status("subscribed", &status, ctx.output)
}

pub(crate) async fn handle_unsubscribe(ctx: &AppContext, args: ChannelArgs) -> CliResult<()> {
    ctx.require_credentials()?;
    let status = ctx.gallery.actions().unsubscribe(&args.channel_id).await?;
    render_status("unsubscribed", &status, ctx.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{FilterArgs, OutputFormat, TagModeArg};
    use crate::client::ReqwestTransport;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::rc::Rc;
    use vidshelf_config::ClientConfig;

    fn context(server: &MockServer) -> AppContext {
        let config = ClientConfig {
            api_base_url: server.base_url(),
            api_key: Some("secret".to_string()),
            ..ClientConfig::default()
        };
        let transport = ReqwestTransport::new(5, "trace").unwrap();
        AppContext::new(config, Rc::new(transport), OutputFormat::Table)
    }

    #[tokio::test]
    async fn available_channels_use_multi_tag_mode() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/channels/available/")
                .query_param("tags", "music,news")
                .query_param("tag_mode", "except")
                .query_param("search", "lo-fi beats");
            then.status(200).json_body(json!({
                "count": 1,
                "next": null,
                "previous": null,
                "results": [{ "id": "UC9", "title": "Beats", "is_subscribed": false, "tags": ["music"] }],
            }));
        });
        let ctx = context(&server);
        let args = ChannelListArgs {
            filter: FilterArgs {
                search: Some("lo-fi beats".to_string()),
                tags: vec!["music".to_string(), "news".to_string()],
                tag_mode: TagModeArg::Except,
                pages: 1,
            },
            available: true,
        };

        handle_channels(&ctx, args).await.unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn missing_channel_is_a_failure() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(DELETE).path("/api/channels/UC404/subscribe/");
            then.status(404).json_body(json!({ "error": "Channel not found" }));
        });
        let ctx = context(&server);

        let err = handle_unsubscribe(
            &ctx,
            ChannelArgs {
                channel_id: "UC404".to_string(),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("Channel not found"));
    }
}
