//! The demo application the host ships: three windows, a math RPC exchanged
//! both ways, a sync call, and navigation interception.
//!
//! In production each surface's content endpoint lives in its own content
//! process; the stubs here bind the content side in-process so the host can
//! run headless end to end.

use std::sync::Arc;
use std::time::Duration;

use atrium_common::{HostError, Rect};
use atrium_events::{EventKind, EventPipeline, Outcome, SurfaceEvent};
use atrium_rpc::{bind, Endpoint, Handlers, RpcError, RpcSchema, SyncHandlers};
use atrium_surface::{RenderBackend, SurfaceConfig, SurfaceRegistry, WindowConfig};
use serde_json::json;
use tracing::{info, warn};

use crate::config::HostConfig;
use crate::headless::HeadlessBackend;

pub async fn run(config: &HostConfig) -> atrium_common::Result<()> {
    let pipeline = Arc::new(EventPipeline::new());
    let backend: Arc<dyn RenderBackend> = Arc::new(HeadlessBackend);
    let mut registry = SurfaceRegistry::new(Arc::clone(&pipeline), backend);
    let max_request_time = Duration::from_millis(config.max_request_time_ms);

    // Process-wide navigation policy: log everything, allow everything.
    pipeline.on_global(EventKind::WillNavigate, |event, response| {
        if let SurfaceEvent::WillNavigate { surface_id, url } = event {
            info!(surface_id = %surface_id, url = %url, "global will-navigate handler");
        }
        response.set(Outcome::Allow);
    });

    // --- main window: math RPC both ways plus a sync bridge ---------------

    let main_window = registry
        .create_window(
            WindowConfig::new("my url window")
                .with_frame(Rect::new(2000.0, 2000.0, 1800.0, 600.0)),
        )
        .map_err(surface_err)?;

    let host_handlers = Handlers::new()
        .request("do_more_math", |args| async move {
            let a = args["a"].as_i64().unwrap_or(0);
            let b = args["b"].as_i64().unwrap_or(0);
            info!(a, b, "main surface asked the host to do more math");
            Ok(json!(a + b))
        })
        .message("log_to_host", |payload| {
            info!(msg = payload["msg"].as_str().unwrap_or(""), "log message from surface");
        })
        .on_any_message(|name, payload| {
            info!(message = %name, %payload, "observed surface message");
        });
    let sync_handlers = SyncHandlers::new().handler("do_sync_math", |args| {
        let a = args["a"].as_i64().unwrap_or(0);
        let b = args["b"].as_i64().unwrap_or(0);
        info!(a, b, "doing sync math for the main surface");
        Ok(json!(a + b))
    });

    let (main_surface, main_content_raw) = registry
        .create_surface(
            main_window,
            SurfaceConfig::new("views://mainview/index.html")
                .with_rpc(
                    RpcSchema::new().request("do_more_math").message("log_to_host"),
                    host_handlers,
                )
                .with_sync(sync_handlers)
                .with_max_request_time(max_request_time),
        )
        .map_err(surface_err)?;

    // Content-process stub for the main surface.
    let main_content: Arc<Endpoint> = Arc::new(
        main_content_raw.bind(
            bind(
                &RpcSchema::new().request("do_math").message("log_to_view"),
                Handlers::new()
                    .request("do_math", |args| async move {
                        let a = args["a"].as_i64().unwrap_or(0);
                        let b = args["b"].as_i64().unwrap_or(0);
                        Ok(json!(a + b))
                    })
                    .message("log_to_view", |payload| {
                        info!(msg = payload["msg"].as_str().unwrap_or(""), "view received log message");
                    }),
            )
            .map_err(rpc_err)?,
            None,
        ),
    );

    registry
        .set_window_title(main_window, "url browserwindow")
        .map_err(surface_err)?;

    // --- wiki window: preload plus a per-surface navigation override ------

    let wiki_window = registry
        .create_window(
            WindowConfig::new("my url window").with_frame(Rect::new(1000.0, 0.0, 1800.0, 600.0)),
        )
        .map_err(surface_err)?;
    let (wiki_surface, wiki_content_raw) = registry
        .create_surface(
            wiki_window,
            SurfaceConfig::new("https://en.wikipedia.org/wiki/Special:Random")
                .with_preload("views://myextension/preload.js")
                .with_max_request_time(max_request_time),
        )
        .map_err(surface_err)?;
    let _wiki_content = wiki_content_raw.bind(
        bind(
            &RpcSchema::new().request("get_title"),
            Handlers::new().request("get_title", |_| async { Ok(json!("Special:Random")) }),
        )
        .map_err(rpc_err)?,
        None,
    );

    // The surface's own handler runs after the global one and may undo a
    // denial an earlier handler left behind.
    if let Some(surface) = registry.surface(wiki_surface) {
        surface.on(EventKind::WillNavigate, |event, response| {
            if let SurfaceEvent::WillNavigate { surface_id, url } = event {
                info!(surface_id = %surface_id, url = %url, "wiki surface will-navigate handler");
            }
            if response.was_set() && response.outcome() == Some(Outcome::Deny) {
                response.set(Outcome::Allow);
            }
        });
    }

    registry
        .set_window_title(wiki_window, "New title from host")
        .map_err(surface_err)?;

    // --- tag window: a plain container, no RPC ----------------------------

    let tag_window = registry
        .create_window(
            WindowConfig::new("webview tag test")
                .with_frame(Rect::new(1300.0, 100.0, 1800.0, 1200.0)),
        )
        .map_err(surface_err)?;
    let (tag_surface, tag_content_raw) = registry
        .create_surface(
            tag_window,
            SurfaceConfig::new("views://webviewtag/index.html")
                .with_max_request_time(max_request_time),
        )
        .map_err(surface_err)?;
    let _tag_content = tag_content_raw.bind(
        bind(&RpcSchema::new(), Handlers::new()).map_err(rpc_err)?,
        None,
    );

    // Initial navigations run through the event chain like any other.
    for surface_id in [main_surface, wiki_surface, tag_surface] {
        let url = registry
            .surface(surface_id)
            .map(|s| s.url().to_string())
            .unwrap_or_default();
        if registry.request_navigation(surface_id, url).map_err(surface_err)? {
            registry.mark_ready(surface_id).map_err(surface_err)?;
        }
    }

    // --- the demo exchange -------------------------------------------------

    registry
        .execute_script(
            main_surface,
            "document.body.innerHTML = 'executing script in the main surface';",
        )
        .map_err(surface_err)?;

    match registry
        .surface(wiki_surface)
        .ok_or(HostError::Surface("wiki surface gone".into()))?
        .request("get_title", json!({}))
        .await
    {
        Ok(title) => info!(%title, "visiting wikipedia article"),
        Err(e) => warn!(error = %e, "get_title failed"),
    }

    match registry
        .surface(main_surface)
        .ok_or(HostError::Surface("main surface gone".into()))?
        .request("do_math", json!({"a": 3, "b": 4}))
        .await
    {
        Ok(result) => info!(%result, "asked the main surface to do math"),
        Err(e) => warn!(error = %e, "do_math failed"),
    }

    if let Some(surface) = registry.surface(main_surface) {
        surface
            .send("log_to_view", json!({"msg": "hi from the host!"}))
            .map_err(rpc_call_err)?;
    }

    // Traffic from the content side: a message (specific handler plus the
    // wildcard observer), an async request, and a blocking sync call.
    main_content
        .send("log_to_host", json!({"msg": "hi from the view"}))
        .map_err(rpc_call_err)?;

    match main_content.request("do_more_math", json!({"a": 5, "b": 6})).await {
        Ok(result) => info!(%result, "the view asked the host for more math"),
        Err(e) => warn!(error = %e, "do_more_math failed"),
    }

    let sync_content = Arc::clone(&main_content);
    let sync_result = tokio::task::spawn_blocking(move || match sync_content.sync() {
        Some(sync) => sync.call_sync("do_sync_math", json!({"a": 3, "b": 4})),
        None => Err(RpcError::ConnectionClosed),
    })
    .await
    .map_err(|e| HostError::Other(e.to_string()))?;
    match sync_result {
        Ok(result) => info!(%result, "sync math result"),
        Err(e) => warn!(error = %e, "do_sync_math failed"),
    }

    // Let fire-and-forget messages drain before teardown.
    tokio::time::sleep(Duration::from_millis(100)).await;
    registry.destroy_all();
    info!("demo finished");
    Ok(())
}

fn surface_err(e: atrium_surface::RegistryError) -> HostError {
    HostError::Surface(e.to_string())
}

fn rpc_err(e: atrium_rpc::SchemaMismatch) -> HostError {
    HostError::Rpc(e.to_string())
}

fn rpc_call_err(e: RpcError) -> HostError {
    HostError::Rpc(e.to_string())
}
