//! 브로커 대시보드 API 서버.
//!
//! Axum 기반 REST + WebSocket 서버를 시작합니다. 업스트림 브로커
//! 자격증명이 없거나 로그인에 실패해도 합성 데이터로 동작합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use dash_api::metrics::{record_broker_fallback, setup_metrics_recorder};
use dash_api::middleware::metrics_layer;
use dash_api::routes::create_api_router;
use dash_api::scheduler::FanoutScheduler;
use dash_api::state::AppState;
use dash_api::websocket::{run_heartbeat, websocket_router, WsState};
use dash_broker::{BrokerCredentials, SmartApiClient, SyntheticFallback};
use dash_core::config::AppConfig;
use dash_core::logging::{init_logging, LogConfig};

/// 업스트림 브로커 클라이언트 생성.
///
/// 자격증명이 없으면 합성 데이터만 쓰는 대체 계층을 반환합니다.
fn create_broker(config: &AppConfig) -> SyntheticFallback<SmartApiClient> {
    let Some(api_key) = config.broker.api_key.as_ref().filter(|_| config.broker.has_credentials())
    else {
        warn!("Broker credentials not set, running on synthetic data only");
        return SyntheticFallback::synthetic_only();
    };

    match SmartApiClient::new(&config.broker.base_url, api_key.clone()) {
        Ok(client) => {
            info!(base_url = %config.broker.base_url, "Upstream broker configured");
            SyntheticFallback::new(client)
        }
        Err(e) => {
            error!(error = %e, "Failed to create upstream client, running on synthetic data only");
            SyntheticFallback::synthetic_only()
        }
    }
}

/// 서버 시작 시 업스트림 로그인을 시도합니다.
///
/// 실패해도 서버는 합성 데이터로 계속 동작합니다.
async fn try_initial_login(state: &AppState) {
    let broker = &state.config.broker;
    let (Some(api_key), Some(client_code), Some(mpin), Some(totp)) = (
        broker.api_key.as_ref(),
        broker.client_code.as_ref(),
        broker.mpin.as_ref(),
        broker.totp.as_ref(),
    ) else {
        return;
    };

    let credentials = BrokerCredentials {
        api_key: api_key.clone(),
        client_code: client_code.clone(),
        mpin: mpin.clone(),
        totp: totp.clone(),
    };

    match state.broker.login(&credentials).await {
        Ok(_) => info!("Initial upstream login succeeded"),
        Err(e) => {
            record_broker_fallback("login");
            warn!(error = %e, "Initial upstream login failed, continuing on synthetic data");
        }
    }
}

/// CORS 미들웨어 구성.
///
/// CORS_ORIGINS 환경변수가 설정되어 있으면 해당 origin만 허용합니다.
/// 설정되지 않으면 개발 모드로 간주하여 모든 origin을 허용합니다.
fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => {
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::HeaderName::from_static("x-session-id"),
        ])
        .allow_credentials(std::env::var("CORS_ORIGINS").is_ok())
        .max_age(Duration::from_secs(3600))
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// 전체 라우터 생성.
fn create_router(
    state: Arc<AppState>,
    metrics_handle: PrometheusHandle,
    ws_state: WsState,
) -> Router {
    // 메트릭 라우터 (별도 상태)
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    let request_timeout = state.config.server.request_timeout_secs;

    Router::new()
        .merge(metrics_router)
        .merge(create_api_router(state))
        .nest("/ws", websocket_router(ws_state))
        // 메트릭 미들웨어 (모든 요청에 적용)
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        // 전역 타임아웃 - 408 상태 코드 반환
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout),
        ))
        .layer(cors_layer())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    // 설정 로드 (파일 + FSDASH__ 환경변수)
    let config = AppConfig::load_default()?;

    // tracing 초기화
    let log_config = LogConfig::new(&config.logging.level)
        .with_format(config.logging.format.parse().unwrap_or_default());
    init_logging(log_config)?;

    info!("Starting FS DASH API server...");

    // Prometheus 메트릭 레코더 설정
    let metrics_handle = setup_metrics_recorder();
    info!("Prometheus metrics recorder initialized");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            error!(
                host = %config.server.host,
                port = config.server.port,
                "Invalid listen address"
            );
            e
        })?;

    // 브로커 클라이언트 + 애플리케이션 상태 생성
    let broker = create_broker(&config);
    let state = Arc::new(AppState::new(config, broker));

    info!(version = %state.version, "Application state initialized");

    // 초기 업스트림 로그인 시도 (실패해도 계속)
    try_initial_login(&state).await;

    // 전역 종료 토큰 생성 (백그라운드 태스크에 전파)
    let shutdown_token = CancellationToken::new();

    // 팬아웃 스케줄러 시작
    let scheduler = Arc::new(FanoutScheduler::new(
        state.broker.clone(),
        state.caches.clone(),
        state.sessions.clone(),
        state.registry.clone(),
        state.config.fanout.symbols.clone(),
        state.config.cache.ttl_secs,
    ));
    let _scheduler_handles = scheduler.spawn_all(
        &state.config.fanout,
        state.config.session.sweep_interval_secs,
        shutdown_token.clone(),
    );

    // 하트비트 태스크 시작
    let _heartbeat_handle = tokio::spawn(run_heartbeat(
        state.registry.clone(),
        Duration::from_secs(state.config.fanout.heartbeat_interval_secs),
        shutdown_token.clone(),
    ));

    // 라우터 생성
    let ws_state = WsState::new(state.registry.clone(), state.version.clone());
    let app = create_router(state, metrics_handle, ws_state);

    info!(%addr, "API server listening");
    info!("Metrics available at http://{}/metrics", addr);
    info!("WebSocket available at ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
        .await?;

    info!("Server shutdown initiated, cleaning up...");

    // 백그라운드 태스크에 종료 시그널 전파
    shutdown_token.cancel();

    let cleanup_timeout = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        info!("Cleanup completed");
    })
    .await;

    if cleanup_timeout.is_err() {
        warn!("Cleanup timeout, forcing shutdown");
    }

    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    shutdown_token.cancel();
    info!("Shutdown signal propagated to background tasks");
}
