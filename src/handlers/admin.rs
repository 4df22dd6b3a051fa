use crate::middlewares::AdminGuard;
use crate::models::*;
use crate::services::{DrawService, ItemService, ParticipantService, VoteService};
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/admin/items/import",
    tag = "admin",
    request_body = ImportItemsRequest,
    security(("admin_password" = [])),
    responses(
        (status = 200, description = "Catalog replaced; votes and results cleared", body = ImportItemsResponse),
        (status = 401, description = "Wrong admin password")
    )
)]
/// Replace the item catalog (columns `name`, `category`, `quantity`).
pub async fn import_items(
    service: web::Data<ItemService>,
    request: web::Json<ImportItemsRequest>,
) -> Result<HttpResponse> {
    match service.import(&request.items).await {
        Ok(imported) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": ImportItemsResponse { imported },
            "message": "Items imported, votes and results cleared"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/clear/all",
    tag = "admin",
    security(("admin_password" = [])),
    responses(
        (status = 200, description = "Items, votes and results cleared"),
        (status = 401, description = "Wrong admin password")
    )
)]
pub async fn clear_all(service: web::Data<DrawService>) -> Result<HttpResponse> {
    match service.clear_all().await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Items, votes and results cleared"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/clear/results",
    tag = "admin",
    security(("admin_password" = [])),
    responses(
        (status = 200, description = "Results cleared"),
        (status = 401, description = "Wrong admin password")
    )
)]
pub async fn clear_results(service: web::Data<DrawService>) -> Result<HttpResponse> {
    match service.clear_results().await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Results cleared"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/participants/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "Participant id")),
    security(("admin_password" = [])),
    responses(
        (status = 200, description = "Participant, their votes and allocations removed"),
        (status = 404, description = "Participant not found")
    )
)]
pub async fn delete_participant(
    service: web::Data<ParticipantService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.delete(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Participant deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/participants/{id}/votes/detailed",
    tag = "admin",
    params(("id" = i64, Path, description = "Participant id")),
    security(("admin_password" = [])),
    responses(
        (status = 200, description = "Votes with item names", body = [VoteDetailResponse]),
        (status = 404, description = "Participant not found")
    )
)]
pub async fn participant_votes(
    service: web::Data<VoteService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.get_votes_detailed(path.into_inner()).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/overview",
    tag = "admin",
    security(("admin_password" = [])),
    responses(
        (status = 200, description = "Counts and submission state", body = OverviewResponse)
    )
)]
pub async fn overview(service: web::Data<DrawService>) -> Result<HttpResponse> {
    match service.overview().await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/draw",
    tag = "admin",
    request_body = RunDrawRequest,
    security(("admin_password" = [])),
    responses(
        (status = 200, description = "Draw finished", body = DrawResponse),
        (status = 409, description = "No items or no participants")
    )
)]
/// Run the draw:
/// 1. Phase A gives everyone at most one item they voted on
/// 2. Phase B hands out the rest with the win penalty applied
/// 3. Previous results are replaced
///
/// The same seed on unchanged votes gives the same result.
pub async fn run_draw(
    service: web::Data<DrawService>,
    request: Option<web::Json<RunDrawRequest>>,
) -> Result<HttpResponse> {
    let seed = request.and_then(|r| r.into_inner().seed);
    match service.run_draw(seed).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": data,
            "message": "Draw finished"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(password: String) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.service(
            web::scope("/admin")
                .wrap(AdminGuard::new(password))
                .route("/items/import", web::post().to(import_items))
                .route("/clear/all", web::post().to(clear_all))
                .route("/clear/results", web::post().to(clear_results))
                .route("/participants/{id}", web::delete().to(delete_participant))
                .route(
                    "/participants/{id}/votes/detailed",
                    web::get().to(participant_votes),
                )
                .route("/overview", web::get().to(overview))
                .route("/draw", web::post().to(run_draw)),
        );
    }
}
