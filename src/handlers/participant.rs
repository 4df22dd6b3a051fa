use crate::models::*;
use crate::services::{ParticipantService, VoteService};
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/participants",
    tag = "participants",
    request_body = RegisterParticipantRequest,
    responses(
        (status = 200, description = "Participant registered (or already existed)", body = ParticipantResponse),
        (status = 400, description = "Empty name")
    )
)]
/// Register by name. Registering an existing name returns that participant.
pub async fn register(
    service: web::Data<ParticipantService>,
    request: web::Json<RegisterParticipantRequest>,
) -> Result<HttpResponse> {
    match service.register(&request.name).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/participants",
    tag = "participants",
    responses(
        (status = 200, description = "Participants, oldest first", body = [ParticipantResponse])
    )
)]
pub async fn list(service: web::Data<ParticipantService>) -> Result<HttpResponse> {
    match service.list().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": list }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/participants/{id}",
    tag = "participants",
    params(("id" = i64, Path, description = "Participant id")),
    responses(
        (status = 200, description = "Participant", body = ParticipantResponse),
        (status = 404, description = "Participant not found")
    )
)]
pub async fn get(
    service: web::Data<ParticipantService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.get(path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/participants/{id}/status",
    tag = "participants",
    params(("id" = i64, Path, description = "Participant id")),
    responses(
        (status = 200, description = "Vote sum and whether it counts as submitted", body = SubmissionStatus),
        (status = 404, description = "Participant not found")
    )
)]
pub async fn status(
    service: web::Data<VoteService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.status(path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/participants/{id}/votes",
    tag = "votes",
    params(("id" = i64, Path, description = "Participant id")),
    responses(
        (status = 200, description = "Stored votes (item id -> points)", body = VotesResponse),
        (status = 404, description = "Participant not found")
    )
)]
pub async fn get_votes(
    service: web::Data<VoteService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.get_votes_response(path.into_inner()).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/participants/{id}/votes",
    tag = "votes",
    params(("id" = i64, Path, description = "Participant id")),
    request_body = SubmitVotesRequest,
    responses(
        (status = 200, description = "Votes replaced", body = VotesResponse),
        (status = 400, description = "Budget, minimum count or unknown item"),
        (status = 404, description = "Participant not found")
    )
)]
/// Replace the participant's whole vote set.
/// Nothing is stored when validation fails.
pub async fn submit_votes(
    service: web::Data<VoteService>,
    path: web::Path<i64>,
    request: web::Json<SubmitVotesRequest>,
) -> Result<HttpResponse> {
    match service.submit_votes(path.into_inner(), &request.votes).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": data,
            "message": "Votes saved"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn participant_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/participants")
            .route("", web::post().to(register))
            .route("", web::get().to(list))
            .route("/{id}", web::get().to(get))
            .route("/{id}/status", web::get().to(status))
            .route("/{id}/votes", web::get().to(get_votes))
            .route("/{id}/votes", web::put().to(submit_votes)),
    );
}
