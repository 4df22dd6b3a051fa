use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::middlewares::ADMIN_PASSWORD_HEADER;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_password",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ADMIN_PASSWORD_HEADER))),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::participant::register,
        handlers::participant::list,
        handlers::participant::get,
        handlers::participant::status,
        handlers::participant::get_votes,
        handlers::participant::submit_votes,
        handlers::item::list,
        handlers::item::totals,
        handlers::results::latest,
        handlers::results::versions,
        handlers::admin::import_items,
        handlers::admin::clear_all,
        handlers::admin::clear_results,
        handlers::admin::delete_participant,
        handlers::admin::participant_votes,
        handlers::admin::overview,
        handlers::admin::run_draw,
    ),
    components(
        schemas(
            RegisterParticipantRequest,
            ParticipantResponse,
            ImportItemRow,
            ImportItemsRequest,
            ImportItemsResponse,
            ItemResponse,
            ItemTotalsResponse,
            SubmitVotesRequest,
            VotesResponse,
            VoteDetailResponse,
            SubmissionStatus,
            RunDrawRequest,
            DrawResponse,
            RunResponse,
            AllocationResponse,
            ParticipantWinnings,
            ResultsResponse,
            VersionsResponse,
            OverviewResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "participants", description = "Participant registration API"),
        (name = "votes", description = "Vote submission API"),
        (name = "items", description = "Item catalog API"),
        (name = "results", description = "Draw results API"),
        (name = "admin", description = "Import, draw and maintenance API"),
    ),
    info(
        title = "Raffle Backend API",
        version = "1.0.0",
        description = "Points-weighted item raffle REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
