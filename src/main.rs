use actix_web::{App, HttpServer, middleware::Logger, web};
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use chrono::Local;  // timestamp in log lines
use std::sync::Arc;
use tokio::sync::Mutex;

use raffle_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::create_cors,
    services::*,
    swagger::swagger_config,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // draw, clear, import and participant delete share one lock
    let admin_lock: AdminLock = Arc::new(Mutex::new(()));

    let participant_service = ParticipantService::new(pool.clone(), admin_lock.clone());
    let item_service = ItemService::new(pool.clone(), admin_lock.clone());
    let vote_service = VoteService::new(pool.clone(), config.raffle.clone());
    let draw_service = DrawService::new(
        pool.clone(),
        vote_service.clone(),
        config.raffle.win_penalty(),
        config.raffle.point_budget,
        admin_lock,
    );
    let meta_service = MetaService::new(pool.clone());

    log::info!(
        "Raffle rules: point_budget={}, max_per_item={}, min_voted_items={}, win multipliers={:?} floor={}",
        config.raffle.point_budget,
        config.raffle.max_per_item,
        config.raffle.min_voted_items,
        config.raffle.win_multipliers,
        config.raffle.win_multiplier_floor
    );
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let admin_password = config.admin.password.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .app_data(web::Data::new(participant_service.clone()))
            .app_data(web::Data::new(item_service.clone()))
            .app_data(web::Data::new(vote_service.clone()))
            .app_data(web::Data::new(draw_service.clone()))
            .app_data(web::Data::new(meta_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::participant_config)
                    .configure(handlers::item_config)
                    .configure(handlers::results_config)
                    .configure(handlers::admin_config(admin_password.clone())),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
