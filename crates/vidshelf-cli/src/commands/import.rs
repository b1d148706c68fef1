use tracing::info;

use crate::cli::ImportArgs;
use crate::client::{AppContext, CliResult};
use crate::output::{render_import, render_quota};

pub(crate) async fn handle_quota(ctx: &AppContext) -> CliResult<()> {
    let quota = ctx.gallery.actions().fetch_quota().await.into_result()?;
    render_quota(&quota, ctx.output)
}

/// Import subscriptions, checking today's quota first unless `--force`.
pub(crate) async fn handle_import(ctx: &AppContext, args: ImportArgs) -> CliResult<()> {
    ctx.require_credentials()?;
    let actions = ctx.gallery.actions();
    let quota = if args.force {
        None
    } else {
        Some(actions.fetch_quota().await.into_result()?)
    };
    if let Some(quota) = &quota {
        info!(used = quota.used, remaining = quota.remaining, "quota checked before import");
    }
    let summary = actions
        .import_subscriptions(quota.as_ref())
        .await
        .into_result()?;
    render_import(&summary, ctx.output)
}

#[cfg(test)]
#[allow(deprecated)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
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
    async fn exhausted_quota_blocks_import_locally() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/quota/");
            then.status(200).json_body(json!({ "used": 10000, "limit": 10000 }));
        });
        let import = server.mock(|when, then| {
            when.method(POST).path("/api/import/subscriptions/");
            then.status(200);
        });
        let ctx = context(&server);

        let err = handle_import(&ctx, ImportArgs { force: false }).await.unwrap_err();

        assert_eq!(err.exit_code(), 5);
        import.assert_hits(0);
    }

    #[tokio::test]
    async fn forced_import_reports_server_quota_error() {
        let server = MockServer::start_async().await;
        let quota = server.mock(|when, then| {
            when.method(GET).path("/api/quota/");
            then.status(200);
        });
        server.mock(|when, then| {
            when.method(POST).path("/api/import/subscriptions/");
            then.status(429).json_body(json!({
                "error": "quota_exceeded",
                "quota_info": { "used": 9990, "limit": 10000 },
            }));
        });
        let ctx = context(&server);

        let err = handle_import(&ctx, ImportArgs { force: true }).await.unwrap_err();

        assert_eq!(err.exit_code(), 5);
        assert!(err.display_message().contains("9990/10000"));
        quota.assert_hits(0);
    }
}
