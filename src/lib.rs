pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod provider;
pub mod response;
pub mod routes;
pub mod validation;

use actix_web::web;

use routes::{reservation, review, room, user};

/// Mounts every endpoint scope. Shared by the server binary and the
/// integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(response::json_error_handler))
        .service(web::scope("/user").configure(user::config))
        .service(web::scope("/room").configure(room::config))
        .service(web::scope("/reservation").configure(reservation::config))
        .service(web::scope("/review").configure(review::config));
}
