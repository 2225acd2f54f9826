use anyhow::Context;
use std::sync::Arc;
use testwindow_api::{
    config::{Config, TelemetrySettings},
    create_router,
    engine::SystemClock,
    services::{test_catalog::MongoTestCatalog, AppState},
};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    let telemetry = config
        .telemetry
        .otlp_endpoint
        .as_deref()
        .map(init_telemetry)
        .transpose()?;
    init_tracing(&config.telemetry, telemetry.as_ref().map(|(_, tracer)| tracer.clone()));

    tracing::info!(
        env = %std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string()),
        otlp = telemetry.is_some(),
        "Starting Test Window API"
    );

    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .context("Failed to create MongoDB client")?;
    let catalog = Arc::new(MongoTestCatalog::new(
        mongo_client.database(&config.mongo_database),
    ));
    tracing::info!(database = %config.mongo_database, "MongoDB test catalog ready");

    let bind_addr = config.bind_addr.clone();
    let app_state = Arc::new(AppState::new(config, catalog, Arc::new(SystemClock)));
    let app = create_router(app_state.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    app_state.sessions.shutdown().await;

    if let Some((provider, _)) = telemetry {
        tracing::info!("Shutting down OpenTelemetry");
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = %e, "Failed to shut down OpenTelemetry");
        }
    }

    Ok(())
}

fn init_tracing(settings: &TelemetrySettings, tracer: Option<opentelemetry_sdk::trace::Tracer>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "testwindow_api=debug,tower_http=debug".into());

    let fmt_layer = if settings.json_logs {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer)))
        .init();
}

fn init_telemetry(
    otlp_endpoint: &str,
) -> anyhow::Result<(
    opentelemetry_sdk::trace::SdkTracerProvider,
    opentelemetry_sdk::trace::Tracer,
)> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::SdkTracerProvider;
    use opentelemetry_sdk::Resource;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(otlp_endpoint)
        .build()
        .context("Failed to create OTLP exporter")?;

    let resource = Resource::builder_empty()
        .with_service_name("testwindow-api")
        .with_attributes(vec![KeyValue::new(
            "service.version",
            env!("CARGO_PKG_VERSION"),
        )])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    let tracer = provider.tracer("testwindow-api");
    opentelemetry::global::set_tracer_provider(provider.clone());

    Ok((provider, tracer))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
