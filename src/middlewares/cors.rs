use actix_cors::Cors;
use actix_web::http::header;

use super::ADMIN_PASSWORD_HEADER;

pub fn create_cors() -> Cors {
    Cors::default()
        .allowed_origin_fn(|_, _req_head| {
            // any origin; tighten for public deployments
            true
        })
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .allowed_header(ADMIN_PASSWORD_HEADER)
        .max_age(3600)
}
