use crate::model::InviteStats;
use crate::status_cache::StatusCache;
use actix_web::{web, HttpResponse};
use log::debug;

/// Serves whatever the poller last published. Never touches the game server.
pub async fn server_status(cache: web::Data<StatusCache>) -> HttpResponse {
    let status = cache.get();
    debug!("serving status, online: {}", status.is_online());
    HttpResponse::Ok().json(status)
}

pub async fn invite_stats(cache: Option<web::Data<StatusCache<InviteStats>>>) -> HttpResponse {
    match cache {
        Some(cache) => HttpResponse::Ok().json(cache.get()),
        None => HttpResponse::NotFound().body("invite stats are not configured"),
    }
}
