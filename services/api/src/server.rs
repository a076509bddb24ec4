use crate::cli::ServeArgs;
use crate::infra::{issue_sessions, seed_accounts, AppState, LoggingNotifier};
use crate::routes::with_lifecycle_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rentwise::access::{SharedSessions, StaticSessions};
use rentwise::config::{AppConfig, AppEnvironment};
use rentwise::error::{AppError, LifecycleError};
use rentwise::occupancy::OccupancyService;
use rentwise::store::MemoryStore;
use rentwise::telemetry;
use rentwise::tenancy::TenantProvisioningService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(MemoryStore::new());
    let occupancy = Arc::new(OccupancyService::new(store.clone(), config.lease));
    let provisioning = Arc::new(TenantProvisioningService::new(
        occupancy.clone(),
        Arc::new(LoggingNotifier),
        &config.security,
    ));

    let sessions = StaticSessions::new(store.clone());
    let accounts = seed_accounts(store.as_ref()).map_err(LifecycleError::from)?;
    issue_sessions(&sessions, &accounts, config.operator_token.as_deref())
        .map_err(LifecycleError::from)?;
    for account in &accounts {
        if config.environment == AppEnvironment::Production {
            info!(
                role = account.role_label(),
                user_id = %account.user.id,
                "operator account seeded"
            );
        } else {
            info!(
                role = account.role_label(),
                email = %account.user.email,
                token = %account.token,
                "operator session issued"
            );
        }
    }
    if config.operator_token.is_none() && config.environment == AppEnvironment::Production {
        warn!("APP_OPERATOR_TOKEN is unset; authenticated routes are unreachable");
    }
    let sessions: SharedSessions = Arc::new(sessions);

    let app = with_lifecycle_routes(occupancy, provisioning)
        .layer(Extension(sessions))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        vacated_status = ?config.lease.vacated_status,
        delete_policy = ?config.lease.delete_policy,
        "rentwise lifecycle service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
