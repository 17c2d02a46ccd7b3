use actix_web::web;
use crate::ui::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/chat", web::post().to(handlers::send))
        .route("/clear", web::post().to(handlers::clear));
}
