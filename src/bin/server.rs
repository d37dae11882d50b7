use axum::{routing::get, Router};
use helmet_guard::{api, app::AppState, config::Config, migrator, store::DbStore};
use sea_orm::Database;

#[tokio::main]
async fn main() {
    // Load .env if present (dotenvy)
    dotenvy::dotenv().ok();

    helmet_guard::telemetry::init_telemetry("helmet-guard");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    // Database Connection
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    use sea_orm_migration::MigratorTrait;
    migrator::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    // Initialize Metrics
    helmet_guard::metrics::init_metrics(&db).await;

    let state = AppState::new(DbStore::new(db), config.notification_ttl);
    let background = state.start_background_tasks(config.battery_decay_interval);

    let app = app(state.clone(), &config.cors_origin, prometheus_layer, metric_handle);

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Location watch, battery timer, notification timers and the history subscription
    state.dashboard.shutdown();
    for task in background {
        let _ = task.await;
    }
    tracing::info!("Shut down cleanly");
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutting down"),
        Err(err) => tracing::error!("Unable to listen for shutdown signal: {}", err),
    }
}

fn app(
    state: AppState,
    cors_origin: &str,
    prometheus_layer: axum_prometheus::PrometheusMetricLayer<'static>,
    metric_handle: metrics_exporter_prometheus::PrometheusHandle,
) -> Router {
    let cors_origin = match cors_origin.parse::<axum::http::HeaderValue>() {
        Ok(origin) => origin,
        Err(_) => {
            tracing::warn!("Invalid CORS_ORIGIN {:?}, falling back to localhost", cors_origin);
            axum::http::HeaderValue::from_static("http://localhost:3003")
        }
    };

    api::router(state)
        .layer(prometheus_layer)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    // Span name is "METHOD /route", e.g. "POST /alerts/trigger"
                    let span_name = if let Some(path) = matched_path {
                        format!("{} {}", request.method(), path)
                    } else {
                        format!("{} {}", request.method(), request.uri().path())
                    };

                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        // Filled in by handlers
                        table = tracing::field::Empty,
                        action = tracing::field::Empty,
                        alert_id = tracing::field::Empty,
                        contact_id = tracing::field::Empty,
                        business_event = tracing::field::Empty,
                        error = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {
                    // Only completed requests are logged
                })
                .on_response(|response: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                    span.record("status", tracing::field::display(response.status()));
                    span.record("latency", tracing::field::debug(latency));

                    tracing::info!("request completed");
                }),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(cors_origin)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::DELETE,
                ])
                .allow_headers([axum::http::header::CONTENT_TYPE]),
        )
        .route("/metrics", get(|| async move { metric_handle.render() }))
}
