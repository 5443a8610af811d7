//! Server initialization and routing

use crate::api;
use crate::cache::{ActivityCache, MemoryActivityCache, RedisActivityCache};
use crate::config::Config;
use crate::jwt::JwtManager;
use crate::middleware::{ObservabilityLayer, SanitizedMakeSpan};
use crate::migration;
use crate::realtime::{ws, RealtimeHub};
use crate::repository::{
    membership::MembershipRepositoryImpl, organization::OrganizationRepositoryImpl,
};
use crate::service::{
    ActivityRecorder, ActivityService, OrganizationService, ProjectService, TaskService,
};
use crate::tenancy::TenantContextManager;
use anyhow::Result;
use axum::{
    extract::FromRef,
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: PgPool,
    pub organization_service:
        Arc<OrganizationService<MembershipRepositoryImpl, OrganizationRepositoryImpl>>,
    pub project_service: Arc<ProjectService<MembershipRepositoryImpl>>,
    pub task_service: Arc<TaskService<MembershipRepositoryImpl>>,
    pub activity_service: Arc<ActivityService<MembershipRepositoryImpl>>,
    pub memberships: Arc<MembershipRepositoryImpl>,
    pub organizations: Arc<OrganizationRepositoryImpl>,
    pub hub: Arc<RealtimeHub>,
    pub cache: Arc<dyn ActivityCache>,
    pub jwt_manager: JwtManager,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl FromRef<AppState> for JwtManager {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_manager.clone()
    }
}

/// Run the server
pub async fn run(config: Config, metrics_handle: Option<PrometheusHandle>) -> Result<()> {
    // Apply migrations before accepting traffic
    migration::run_migrations(&config).await?;

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    info!("Connected to database");

    // Live activity cache: Redis when configured and reachable, in-process
    // otherwise. Operations degrade to the store either way.
    let cache: Arc<dyn ActivityCache> = match &config.redis {
        Some(redis_config) => match RedisActivityCache::new(redis_config, &config.activity).await {
            Ok(cache) => {
                info!("Connected to Redis live activity cache");
                Arc::new(cache)
            }
            Err(e) => {
                warn!(error = %e, "Redis unavailable, using in-memory live activity cache");
                Arc::new(MemoryActivityCache::from_config(&config.activity))
            }
        },
        None => {
            info!("REDIS_URL not set, using in-memory live activity cache");
            Arc::new(MemoryActivityCache::from_config(&config.activity))
        }
    };

    // Create repositories
    let memberships = Arc::new(MembershipRepositoryImpl::new(db_pool.clone()));
    let organizations = Arc::new(OrganizationRepositoryImpl::new(db_pool.clone()));

    // Tenant context manager and the activity pipeline
    let tenancy = Arc::new(TenantContextManager::new(
        db_pool.clone(),
        memberships.clone(),
    ));
    let hub = Arc::new(RealtimeHub::new());
    let recorder = Arc::new(ActivityRecorder::new(cache.clone(), hub.clone()));

    // Create services
    let organization_service = Arc::new(OrganizationService::new(
        organizations.clone(),
        tenancy.clone(),
        recorder.clone(),
    ));
    let project_service = Arc::new(ProjectService::new(tenancy.clone(), recorder.clone()));
    let task_service = Arc::new(TaskService::new(tenancy.clone(), recorder.clone()));
    let activity_service = Arc::new(ActivityService::new(
        tenancy,
        recorder,
        cache.clone(),
        config.activity.live_capacity,
    ));

    // Create JWT manager
    let jwt_manager = JwtManager::new(config.jwt.clone());

    let http_addr = config.http_addr();

    // Create app state
    let state = AppState {
        config: Arc::new(config),
        db_pool,
        organization_service,
        project_service,
        task_service,
        activity_service,
        memberships,
        organizations,
        hub,
        cache,
        jwt_manager,
        metrics_handle,
    };

    let app = build_router(state);

    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}

/// Build the HTTP router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoints
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready))
        .route("/metrics", get(api::metrics::metrics_handler))
        // Organization endpoints
        .route(
            "/api/v1/orgs",
            get(api::organization::list).post(api::organization::create),
        )
        .route(
            "/api/v1/orgs/{org_id}",
            get(api::organization::get)
                .put(api::organization::update)
                .delete(api::organization::delete),
        )
        .route(
            "/api/v1/orgs/{org_id}/transfer-ownership",
            post(api::organization::transfer_ownership),
        )
        // Membership endpoints
        .route(
            "/api/v1/orgs/{org_id}/members",
            get(api::member::list).post(api::member::add),
        )
        .route(
            "/api/v1/orgs/{org_id}/members/{user_id}",
            put(api::member::change_role).delete(api::member::remove),
        )
        // Project endpoints
        .route(
            "/api/v1/orgs/{org_id}/projects",
            get(api::project::list).post(api::project::create),
        )
        .route(
            "/api/v1/orgs/{org_id}/projects/{project_id}",
            get(api::project::get)
                .put(api::project::update)
                .delete(api::project::delete),
        )
        .route(
            "/api/v1/orgs/{org_id}/projects/{project_id}/members",
            get(api::project::list_members).post(api::project::upsert_member),
        )
        .route(
            "/api/v1/orgs/{org_id}/projects/{project_id}/members/{user_id}",
            delete(api::project::remove_member),
        )
        // Task endpoints
        .route(
            "/api/v1/orgs/{org_id}/projects/{project_id}/tasks",
            get(api::task::list).post(api::task::create),
        )
        .route(
            "/api/v1/orgs/{org_id}/projects/{project_id}/tasks/{task_id}",
            get(api::task::get)
                .put(api::task::update)
                .delete(api::task::delete),
        )
        .route(
            "/api/v1/orgs/{org_id}/projects/{project_id}/tasks/{task_id}/status",
            put(api::task::set_status),
        )
        .route(
            "/api/v1/orgs/{org_id}/projects/{project_id}/tasks/{task_id}/assignee",
            put(api::task::assign),
        )
        // Activity endpoints
        .route("/api/v1/orgs/{org_id}/activities", get(api::activity::list))
        .route(
            "/api/v1/orgs/{org_id}/activities/recent",
            get(api::activity::recent),
        )
        .route(
            "/api/v1/orgs/{org_id}/announcements",
            post(api::activity::announce),
        )
        // Live activity feed
        .route("/api/v1/ws", get(ws::ws_handler))
        // Add middleware
        .layer(ObservabilityLayer)
        .layer(TraceLayer::new_for_http().make_span_with(SanitizedMakeSpan))
        .layer(cors)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}
