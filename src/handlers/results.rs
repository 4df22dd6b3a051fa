#[allow(unused_imports)]
use crate::models::{ResultsResponse, VersionsResponse};
use crate::services::{DrawService, MetaService};
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/results/latest",
    tag = "results",
    responses(
        (status = 200, description = "Latest run with allocations; data is null before the first draw", body = ResultsResponse)
    )
)]
pub async fn latest(service: web::Data<DrawService>) -> Result<HttpResponse> {
    match service.latest_results().await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/versions",
    tag = "results",
    responses(
        (status = 200, description = "Change counters for votes, items and results", body = VersionsResponse)
    )
)]
/// Poll this to notice new votes, imports or a finished draw.
pub async fn versions(service: web::Data<MetaService>) -> Result<HttpResponse> {
    match service.versions().await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn results_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/results/latest", web::get().to(latest))
        .route("/versions", web::get().to(versions));
}
