pub mod status;

use actix_web::{http::Method, middleware::DefaultHeaders, web, HttpRequest, HttpResponse, Resource};


// The site is served from a different origin than this service.
pub fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add((
            "Access-Control-Allow-Headers",
            "authorization, x-client-info, apikey, content-type",
        ))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(with_preflight(web::resource("/").route(web::get().to(index))))
        .service(with_preflight(
            web::resource("/server-status").route(web::get().to(status::server_status)),
        ))
        .service(with_preflight(
            web::resource("/invite-stats").route(web::get().to(status::invite_stats)),
        ));
}

fn with_preflight(resource: Resource) -> Resource {
    resource.route(web::method(Method::OPTIONS).to(preflight))
}

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/json")
        .body("{\"status\": \"ok\"}")
}

async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}

/// Fallback for unrouted paths. CORS preflights still get an empty 200.
pub async fn preflight_or_not_found(req: HttpRequest) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        HttpResponse::Ok().finish()
    } else {
        HttpResponse::NotFound().finish()
    }
}
