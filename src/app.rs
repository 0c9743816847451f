/*
 * Responsibility
 * - Config読み込み → 依存生成 → Router 組み立て
 * - Middleware の適用 (correlation / http / Bearer)
 * - axum::serve() で起動
 */
use anyhow::{Context, Result};
use axum::Router;
use std::{panic, process, sync::Arc, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware;
use crate::services::{
    admin::AdminService,
    audit::{AuditSink, AuditTrail, FileAuditSink, TracingAuditSink},
    auth::{build_service_token_provider, build_token_validator},
    controller::HttpControllerClient,
};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,admin_gateway=debug,audit=info cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panic via tracing so they don't get "lost"
        tracing::error!(?info, "panic");

        // In development, fail fast. In production, keep the default behavior.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting admin gateway in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config)?;
    let app = build_router(state, config.request_timeout);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_state(config: &Config) -> Result<AppState> {
    // Shared by JWKS lookups, the token exchange and ControllerApp calls.
    let http = reqwest::Client::builder()
        .timeout(config.controller_app_timeout)
        .build()
        .context("failed to build HTTP client")?;

    let auth = build_token_validator(config, http.clone())?;

    let tokens = build_service_token_provider(config, http.clone());
    let controller =
        HttpControllerClient::new(http, config.controller_app_base_url.clone(), tokens)?;

    let sink: Arc<dyn AuditSink> = match &config.audit_log_path {
        Some(path) => Arc::new(
            FileAuditSink::open(path)
                .with_context(|| format!("failed to open audit log {}", path.display()))?,
        ),
        None => Arc::new(TracingAuditSink),
    };

    let admin = AdminService::new(Arc::new(controller), AuditTrail::new(sink));

    Ok(AppState::new(auth, Arc::new(admin)))
}

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let admin = middleware::auth::access::apply(api::v1::admin_routes(), state.clone());

    let router = Router::new()
        .merge(api::v1::public_routes())
        .merge(admin)
        .with_state(state);

    let router = middleware::http::apply(router, request_timeout);

    // Outermost: every response, including timeouts and rejections, carries the id.
    middleware::correlation::apply(router)
}
