// Route exports
pub mod routing;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/healthz", web::get().to(routing::health_check))
        .service(web::scope("/v1").configure(routing::configure));
}
