use vidshelf_api_models::Tag;
use vidshelf_ui::core::cache::LoadMoreOutcome;
use vidshelf_ui::core::filters::ApiParamSet;
use vidshelf_ui::core::query_key::{QueryKey, Resource};

use crate::cli::{TagAssignArgs, TagCreateArgs, TagDeleteArgs, TagTarget};
use crate::client::{AppContext, CliResult};
use crate::commands::tag_set;
use crate::output::{render_status, render_tag, render_tags};

/// List the whole tag catalogue, following every page.
pub(crate) async fn handle_tag_list(ctx: &AppContext) -> CliResult<()> {
    let key = QueryKey::bare(Resource::Tags);
    let params = ApiParamSet::default();
    let api = ctx.gallery.api();
    let tags = &ctx.gallery.cache().tags;
    let fetch = |request| api.fetch_page::<Tag>(Resource::Tags, &params, request);

    let entry = tags.query(&key, fetch).await;
    if let Some(error) = entry.error {
        return Err(error.into());
    }
    loop {
        match tags.load_more(&key, fetch).await {
            LoadMoreOutcome::Appended => {}
            LoadMoreOutcome::Failed(error) => return Err(error.into()),
            _ => break,
        }
    }
    let entry = tags.get(&key).unwrap_or_default();
    render_tags(&entry, ctx.output)
}

pub(crate) async fn handle_tag_create(ctx: &AppContext, args: TagCreateArgs) -> CliResult<()> {
    ctx.require_credentials()?;
    let tag = ctx
        .gallery
        .actions()
        .create_tag(&args.name, args.colour.as_deref())
        .await?;
    render_tag(&tag, ctx.output)
}

pub(crate) async fn handle_tag_delete(ctx: &AppContext, args: TagDeleteArgs) -> CliResult<()> {
    ctx.require_credentials()?;
    let status = ctx.gallery.actions().delete_tag(args.id).await?;
    render_status("deleted tag", &status, ctx.output)
}

pub(crate) async fn handle_tag_assign(ctx: &AppContext, args: TagAssignArgs) -> CliResult<()> {
    ctx.require_credentials()?;
    let tags: Vec<String> = tag_set(&args.tags)?.iter().map(str::to_string).collect();
    let actions = ctx.gallery.actions();
    let status = match args.target {
        TagTarget::Video => actions.set_video_tags(&args.id, &tags).await?,
        TagTarget::Channel => actions.set_channel_tags(&args.id, &tags).await?,
    };
    render_status("tags updated", &status, ctx.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::client::ReqwestTransport;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::rc::Rc;
    use vidshelf_config::ClientConfig;
    use vidshelf_test_support::ScriptedTransport;
    use vidshelf_test_support::fixtures::{TEST_BASE_URL, page_body, tag};

    fn context(server: &MockServer) -> AppContext {
        let config = ClientConfig {
            api_base_url: server.base_url(),
            api_key: Some("secret".to_string()),
            ..ClientConfig::default()
        };
        let transport = ReqwestTransport::new(5, "trace").unwrap();
        AppContext::new(config, Rc::new(transport), OutputFormat::Json)
    }

    #[tokio::test]
    async fn tag_list_reads_every_page() {
        let transport = Rc::new(ScriptedTransport::new());
        let next = format!("{TEST_BASE_URL}/api/tags/?page=2");
        transport.push_json(200, &page_body(&[tag(1, "music")], 2, Some(next.as_str())));
        transport.push_json(200, &page_body(&[tag(2, "news")], 2, None));
        let config = ClientConfig {
            api_base_url: TEST_BASE_URL.to_string(),
            ..ClientConfig::default()
        };
        let ctx = AppContext::new(config, transport.clone(), OutputFormat::Table);

        handle_tag_list(&ctx).await.unwrap();

        let urls: Vec<String> = transport.requests().into_iter().map(|request| request.url).collect();
        assert_eq!(urls, [format!("{TEST_BASE_URL}/api/tags/"), next]);
        let names: Vec<String> = ctx
            .gallery
            .cache()
            .tags
            .get(&QueryKey::bare(Resource::Tags))
            .unwrap()
            .items()
            .map(|tag| tag.name.clone())
            .collect();
        assert_eq!(names, ["music", "news"]);
    }

    #[tokio::test]
    async fn assignment_rejects_bad_names_before_sending() {
        let server = MockServer::start_async().await;
        let ctx = context(&server);
        let args = TagAssignArgs {
            target: TagTarget::Video,
            id: "v1".to_string(),
            tags: vec![" ".to_string()],
        };

        let err = handle_tag_assign(&ctx, args).await.unwrap_err();

        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn channel_tags_are_deduplicated() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/channels/UC1/tags/")
                .json_body(json!({ "tags": ["music", "news"] }));
            then.status(200).json_body(json!({ "status": "ok" }));
        });
        let ctx = context(&server);
        let args = TagAssignArgs {
            target: TagTarget::Channel,
            id: "UC1".to_string(),
            tags: vec!["music".to_string(), "news".to_string(), "music".to_string()],
        };

        handle_tag_assign(&ctx, args).await.unwrap();

        mock.assert();
    }
}
