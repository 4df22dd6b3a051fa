use crate::services::ItemService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    responses(
        (status = 200, description = "Items by category and name", body = [crate::models::ItemResponse])
    )
)]
pub async fn list(service: web::Data<ItemService>) -> Result<HttpResponse> {
    match service.list().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/items/totals",
    tag = "items",
    responses(
        (status = 200, description = "Items with total points, highest first", body = [crate::models::ItemTotalsResponse])
    )
)]
pub async fn totals(service: web::Data<ItemService>) -> Result<HttpResponse> {
    match service.list_with_totals().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn item_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/items")
            .route("", web::get().to(list))
            .route("/totals", web::get().to(totals)),
    );
}
