// storefront/src/main.rs

use storefront::config::AppConfig;
use storefront::errors::AppError;
use storefront::pipelines;
use storefront::realtime::RealtimeHub;
use storefront::repository::{PgRepository, Repository};
use storefront::services::notification_dispatcher::NotificationDispatcher;
use storefront::services::web_push::VapidPushTransport;
use storefront::services::whatsapp::HttpMessageGateway;
use storefront::state::AppState;
use storefront::web::configure_app_routes;

use actix_web::{web, App, HttpServer};
use flowline::Flowline;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting storefront server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  let db_pool = match PgPoolOptions::new().max_connections(10).connect(&app_config.database_url).await {
    Ok(pool) => {
      tracing::info!("Connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  if app_config.run_migrations {
    if let Err(e) = sqlx::migrate!("./migrations").run(&db_pool).await {
      let e = AppError::from(e);
      tracing::error!(error = %e, "Migrations failed.");
      return Err(std::io::Error::other(e.to_string()));
    }
    tracing::info!("Database migrations applied.");
  }

  let http_client = reqwest::Client::builder()
    .timeout(app_config.http_timeout)
    .build()
    .map_err(|e| std::io::Error::other(e.to_string()))?;
  let push_transport = VapidPushTransport::new(http_client.clone(), &app_config.push)
    .map_err(|e| std::io::Error::other(e.to_string()))?;
  if !push_transport.is_enabled() {
    tracing::warn!("VAPID key not configured; push notifications will fail.");
  }

  let repository: Arc<dyn Repository> = Arc::new(PgRepository::new(db_pool));
  let realtime = RealtimeHub::new(app_config.realtime.channel_capacity);
  let dispatcher_wakeup = Arc::new(Notify::new());
  let flowline = Arc::new(Flowline::<AppError>::new());

  let app_state = AppState {
    repository: repository.clone(),
    flowline: flowline.clone(),
    config: app_config.clone(),
    realtime: realtime.clone(),
    dispatcher_wakeup: dispatcher_wakeup.clone(),
  };
  pipelines::register_all_pipelines(&flowline, &app_state);

  let dispatcher = Arc::new(NotificationDispatcher::new(
    repository,
    Arc::new(HttpMessageGateway::new(http_client, &app_config.whatsapp)),
    Arc::new(push_transport),
    realtime,
    &app_config,
    dispatcher_wakeup,
  ));
  let (shutdown_tx, shutdown_rx) = watch::channel(false);
  let dispatcher_task = tokio::spawn(dispatcher.run(shutdown_rx));

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  let server_result = HttpServer::new(move || {
    App::new()
      .app_data(web::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await;

  let _ = shutdown_tx.send(true);
  if let Err(e) = dispatcher_task.await {
    tracing::error!(error = %e, "Dispatcher task ended abnormally.");
  }
  server_result
}
