mod config;
mod handlers;
mod invite_stats;
mod model;
mod normalize;
mod server;
mod status_cache;
mod status_poller;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use log::*;
use simplelog::SimpleLogger;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::model::{InviteStats, ServerStatus};
use crate::server::RealServerConnection;
use crate::status_cache::StatusCache;
use crate::status_poller::{PollSettings, StatusPoller};

#[actix_web::main]
async fn main() {
    if let Err(e) = do_main().await {
        error!("status service crashed with error {:#}", e);
        std::process::exit(1);
    }
}

async fn do_main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    // Parse before logging is up so LOG_LEVEL applies; a bad config is reported below
    let config = Config::from_env();
    let log_level = config
        .as_ref()
        .map(|c| c.log_level)
        .unwrap_or(LevelFilter::Info);
    SimpleLogger::init(log_level, simplelog::Config::default())?;
    info!("Logger initialised");
    let config = config.context("invalid configuration")?;

    let shutdown = CancellationToken::new();

    let status_cache = StatusCache::new(ServerStatus::placeholder(&config.default_server_name));
    let poller = StatusPoller::new(
        RealServerConnection,
        PollSettings {
            target: config.upstream.clone(),
            query_timeout: config.query_timeout,
            refresh_interval: config.refresh_interval,
            default_server_name: config.default_server_name.clone(),
            empty_reply_policy: config.empty_reply_policy,
        },
        status_cache.clone(),
    );
    let poller_handle = poller.start_in_background(shutdown.clone());

    let invite_cache = config.invite_code.clone().map(|invite_code| {
        let cache = StatusCache::new(InviteStats::default());
        let handle = invite_stats::start_in_background(
            invite_code,
            config.invite_refresh_interval,
            config.query_timeout,
            cache.clone(),
            shutdown.clone(),
        );
        (cache, handle)
    });
    if invite_cache.is_none() {
        info!("INVITE_CODE not set, invite stats are disabled");
    }

    let status_data = web::Data::new(status_cache);
    let invite_data = invite_cache
        .as_ref()
        .map(|(cache, _)| web::Data::new(cache.clone()));

    let bind = config.bind();
    info!("Starting server on {}", bind);
    let server_result = HttpServer::new(move || {
        let mut app = App::new()
            .wrap(handlers::cors_headers())
            .app_data(status_data.clone());
        if let Some(invite_data) = &invite_data {
            app = app.app_data(invite_data.clone());
        }
        app.configure(handlers::routes)
            .default_service(web::to(handlers::preflight_or_not_found))
    })
    .bind(&bind)
    .with_context(|| format!("could not bind {}", bind))?
    .run()
    .await;

    info!("HTTP server stopped, shutting down pollers");
    shutdown.cancel();
    poller_handle.await.context("status poller panicked")?;
    if let Some((_, handle)) = invite_cache {
        handle.await.context("invite poller panicked")?;
    }

    server_result.context("HTTP server failed")
}
