use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures_util::stream::Stream;
use tokio::sync::broadcast;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, error, info, warn};

use crate::{
    ServeArgs,
    build::{Builder, ChangeKind, FileWatcher, WatchEvent, WatchPaths},
    config::{SiteConfig, config_path_from_arg},
};

const LIVE_RELOAD_PATH: &str = "/_folio/live-reload";

const LIVE_RELOAD_SCRIPT: &str = r#"<script>
(() => {
  const source = new EventSource("/_folio/live-reload");
  source.addEventListener("reload", () => location.reload());
})();
</script>
"#;

/// SSE handler for live reload notifications.
async fn live_reload_handler(
    State(tx): State<broadcast::Sender<()>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = tx.subscribe();
    let stream = async_stream::stream! {
        let mut rx = rx;
        loop {
            match rx.recv().await {
                Ok(_) => {
                    yield Ok(Event::default().event("reload").data("reload"));
                }
                // Only the latest reload matters
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Add the live reload script to every HTML response.
async fn inject_live_reload(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let status = response.status();
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html || !(status == StatusCode::OK || status == StatusCode::NOT_FOUND) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("failed to read response body: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Insert the live reload script before the last `</body>`, or append it.
fn inject_script(html: &str) -> String {
    match html.rfind("</body>") {
        Some(index) => format!("{}{}{}", &html[..index], LIVE_RELOAD_SCRIPT, &html[index..]),
        None => format!("{}{}", html, LIVE_RELOAD_SCRIPT),
    }
}

pub async fn run(args: &ServeArgs) -> Result<(), anyhow::Error> {
    let config_path = config_path_from_arg(args.config_file.as_deref())?;
    let config = Arc::new(SiteConfig::load_from_file(&config_path)?);
    let output_dir = config.output_path();

    // Create broadcast channel for live reload
    let (reload_tx, _) = broadcast::channel::<()>(16);

    println!("Building site...");
    let builder = Builder::new(config.clone());
    let (builder, result) = tokio::task::spawn_blocking(move || {
        let result = builder.build();
        (builder, result)
    })
    .await?;
    match result {
        Ok(result) => println!(
            "Built {} documents ({} drafts skipped)",
            result.documents, result.drafts
        ),
        // Keep serving the previous output while watching
        Err(e) if args.watch => error!("build failed: {}", e),
        Err(e) => return Err(e.into()),
    }

    let _watcher_handle = if args.watch {
        let watch_paths = WatchPaths {
            source_dir: canonical(config.source_path()),
            theme_dir: canonical(config.theme_path()),
            config_path: canonical(config_path.clone()),
        };

        match FileWatcher::new(&config.dev.watch, &watch_paths) {
            Ok(watcher) => {
                println!("Watching for changes...");
                let reload_tx = reload_tx.clone();
                Some(tokio::task::spawn_blocking(move || {
                    rebuild_loop(watcher, config_path, builder, reload_tx)
                }))
            }
            Err(e) => {
                warn!("failed to start file watcher: {}", e);
                None
            }
        }
    } else {
        None
    };

    let serve_dir = ServeDir::new(&output_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(output_dir.join("index.html")));

    let mut app = Router::new()
        .route(LIVE_RELOAD_PATH, get(live_reload_handler))
        .with_state(reload_tx)
        .fallback_service(serve_dir);
    if config.dev.live_reload {
        app = app.layer(middleware::from_fn(inject_live_reload));
    }

    let port = args.port.unwrap_or(config.dev.port);
    let addr: SocketAddr = format!("{}:{}", args.bind, port).parse()?;

    let display_host = if args.bind == "0.0.0.0" {
        "localhost"
    } else {
        &args.bind
    };
    let url = format!("http://{}:{}", display_host, port);

    println!("\nServing site at {}", url);
    println!("Press Ctrl+C to stop\n");

    if args.open
        && let Err(e) = open::that(&url)
    {
        warn!("failed to open browser: {}", e);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Rebuild on every batch of changes, one build at a time.
///
/// Changes that arrive while a build runs are queued by the watcher and
/// folded into the next single rebuild.
fn rebuild_loop(
    watcher: FileWatcher,
    config_path: PathBuf,
    mut builder: Builder,
    reload_tx: broadcast::Sender<()>,
) {
    while let Some(first) = watcher.recv() {
        let mut changes = Vec::new();
        for event in std::iter::once(first).chain(watcher.drain()) {
            match event {
                WatchEvent::FilesChanged(batch) => changes.extend(batch),
                WatchEvent::Error(e) => warn!("watch error: {}", e),
            }
        }
        if changes.is_empty() {
            continue;
        }
        for change in &changes {
            match change {
                ChangeKind::Content(path) | ChangeKind::Theme(path) => {
                    debug!("changed: {}", path.display())
                }
                ChangeKind::Config => debug!("changed: configuration"),
            }
        }

        if changes.contains(&ChangeKind::Config) {
            match SiteConfig::load_from_file(&config_path) {
                Ok(config) => {
                    info!("configuration reloaded");
                    builder = Builder::new(Arc::new(config));
                }
                Err(e) => error!("failed to reload configuration, keeping the previous one: {}", e),
            }
        }

        info!("detected {} change(s), rebuilding", changes.len());
        match builder.build() {
            Ok(result) => {
                info!("rebuilt {} documents", result.documents);
                let _ = reload_tx.send(());
            }
            Err(e) => error!("rebuild failed, serving the previous output: {}", e),
        }
    }
}

/// Canonicalize a path so it matches the paths in file events.
fn canonical(path: PathBuf) -> PathBuf {
    path.canonicalize().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_before_closing_body() {
        let html = "<html><body><p>hi</p></body></html>";
        let injected = inject_script(html);
        assert!(injected.starts_with("<html><body><p>hi</p><script>"));
        assert!(injected.ends_with("</script>\n</body></html>"));
        assert!(injected.contains(LIVE_RELOAD_PATH));
    }

    #[test]
    fn test_inject_appends_without_body() {
        let injected = inject_script("<p>fragment</p>");
        assert!(injected.starts_with("<p>fragment</p><script>"));
    }

    #[test]
    fn test_inject_uses_last_body_tag() {
        let html = "<pre>&lt;/body&gt;</body></body>";
        let injected = inject_script(html);
        assert!(injected.ends_with("</script>\n</body>"));
    }
}
