use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use suncity_registration::config::AppConfig;
use suncity_registration::error::AppError;
use suncity_registration::registration::visitor::{
    ConfirmationMode, FileSnapshotStore, HttpIpLookup, HttpRegistrationGateway,
    InMemorySnapshotStore, SessionRegistry, VisitorWizard, WizardFactory,
};
use suncity_registration::telemetry;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryRegistrationGateway, KioskIpLookup};
use crate::routes::with_registration_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let intake = Arc::new(InMemoryRegistrationGateway::default());
    let factory: WizardFactory = if args.remote {
        let gateway = Arc::new(HttpRegistrationGateway::from_config(&config.backend)?);
        let ip_lookup = Arc::new(HttpIpLookup::from_config(&config.backend)?);
        let snapshot_dir = config.snapshot_dir.clone();
        // Sessions snapshot to disk under their key, so a restarted service
        // hands the same key back its in-flight registration.
        Box::new(move |key: &str| {
            VisitorWizard::new(
                Box::new(gateway.clone()),
                Box::new(FileSnapshotStore::new(&snapshot_dir.join(key))),
                Box::new(ip_lookup.clone()),
                ConfirmationMode::Otp,
            )
        })
    } else {
        // The demo recorder forgets intakes on restart, so durable session
        // snapshots would resume against visitor ids the backend no longer
        // knows; in-memory stores keep the two in step.
        let gateway = intake.clone();
        Box::new(move |_key: &str| {
            VisitorWizard::new(
                Box::new(gateway.clone()),
                Box::new(Arc::new(InMemorySnapshotStore::default())),
                Box::new(KioskIpLookup),
                ConfirmationMode::Otp,
            )
        })
    };
    let registry = Arc::new(SessionRegistry::new(factory));

    let app = with_registration_routes(registry, intake)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, remote = args.remote, "visitor registration service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
