//! WebSocket 연결 handler.
//!
//! Axum WebSocket 엔드포인트 및 메시지 처리.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::messages::{ClientMessage, ServerMessage};
use super::registry::{Directive, SharedRegistry};
use crate::metrics::{decrement_websocket_connections, increment_websocket_connections};

/// WebSocket 상태.
#[derive(Clone)]
pub struct WsState {
    /// 구독 레지스트리
    pub registry: SharedRegistry,
    /// 서버 버전 (환영 메시지용)
    pub version: String,
}

impl WsState {
    /// 새로운 WebSocket 상태 생성.
    pub fn new(registry: SharedRegistry, version: impl Into<String>) -> Self {
        Self {
            registry,
            version: version.into(),
        }
    }
}

/// WebSocket 업그레이드 핸들러.
///
/// # 엔드포인트
///
/// `GET /ws`
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(ws_state): State<WsState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ws_state))
}

/// WebSocket 연결 처리.
async fn handle_socket(socket: WebSocket, state: WsState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    info!("WebSocket connected: {}", conn_id);

    increment_websocket_connections();

    let (broadcast_rx, direct_rx) = state.registry.register(&conn_id).await;

    let (mut sender, mut receiver) = socket.split();

    // 연결 수립 확인 전송
    let established = ServerMessage::ConnectionEstablished {
        message: format!("Connected to FS DASH v{}", state.version),
        timestamp: Utc::now().timestamp_millis(),
    };
    if let Ok(json) = established.to_json() {
        let _ = sender.send(Message::Text(json.into())).await;
    }

    // 클라이언트 메시지 수신 태스크
    let conn_id_clone = conn_id.clone();
    let registry_clone = state.registry.clone();
    let receive_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_client_message(&conn_id_clone, msg, &registry_clone).await {
                        break;
                    }
                }
                Err(e) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
            }
        }
    });

    // broadcast + direct 전송 태스크
    let conn_id_clone = conn_id.clone();
    let registry_clone = state.registry.clone();
    let send_task = tokio::spawn(async move {
        let mut broadcast_rx = broadcast_rx;
        let mut direct_rx = direct_rx;
        loop {
            tokio::select! {
                broadcast_msg = broadcast_rx.recv() => match broadcast_msg {
                    Ok(msg) => {
                        // 이 연결 몫만 걸러서 전송
                        if let Some(filtered) =
                            registry_clone.filter_for_conn(&conn_id_clone, &msg).await
                        {
                            if let Ok(json) = filtered.to_json() {
                                if sender.send(Message::Text(json.into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                directive = direct_rx.recv() => match directive {
                    Some(Directive::Message(msg)) => {
                        if let Ok(json) = msg.to_json() {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Directive::Ping) => {
                        if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Directive::Close) => {
                        let _ = sender.send(Message::Close(None)).await;
                        break;
                    }
                    None => break,
                },
            }
        }
    });

    // 하나의 태스크가 종료되면 다른 것도 종료
    tokio::select! {
        _ = receive_task => {
            debug!("Receive task ended for connection: {}", conn_id);
        }
        _ = send_task => {
            debug!("Send task ended for connection: {}", conn_id);
        }
    }

    state.registry.unregister(&conn_id).await;

    decrement_websocket_connections();

    info!("WebSocket disconnected: {}", conn_id);
}

/// 클라이언트 메시지 처리.
///
/// # Returns
///
/// `true`면 연결 유지, `false`면 연결 종료
async fn handle_client_message(conn_id: &str, msg: Message, registry: &SharedRegistry) -> bool {
    match msg {
        Message::Text(text) => match ClientMessage::from_json(&text) {
            Ok(client_msg) => process_client_message(conn_id, client_msg, registry).await,
            Err(e) => {
                warn!("Invalid message from {}: {}", conn_id, e);
                // 잘못된 메시지는 에러 응답만 보내고 연결은 유지
                registry
                    .send_direct(
                        conn_id,
                        Directive::Message(ServerMessage::error("INVALID_MESSAGE", e.to_string())),
                    )
                    .await;
                true
            }
        },
        Message::Binary(_) => {
            warn!("Binary messages not supported");
            true
        }
        Message::Ping(_) => true,
        Message::Pong(_) => {
            // 하트비트 응답
            registry.mark_alive(conn_id).await;
            true
        }
        Message::Close(_) => {
            debug!("Close message received from {}", conn_id);
            false
        }
    }
}

/// 파싱된 클라이언트 메시지 처리.
async fn process_client_message(
    conn_id: &str,
    msg: ClientMessage,
    registry: &SharedRegistry,
) -> bool {
    match msg {
        ClientMessage::Subscribe { symbols } => {
            let effective = registry.set_subscriptions(conn_id, &symbols).await;
            debug!("Connection {} subscribed to: {:?}", conn_id, effective);

            registry
                .send_direct(
                    conn_id,
                    Directive::Message(ServerMessage::SubscriptionConfirmed {
                        symbols: effective,
                    }),
                )
                .await;
            true
        }

        ClientMessage::Unsubscribe => {
            registry.clear_subscriptions(conn_id).await;
            debug!("Connection {} unsubscribed", conn_id);

            registry
                .send_direct(
                    conn_id,
                    Directive::Message(ServerMessage::UnsubscriptionConfirmed),
                )
                .await;
            true
        }

        ClientMessage::Ping => {
            registry
                .send_direct(
                    conn_id,
                    Directive::Message(ServerMessage::Pong {
                        timestamp: Utc::now().timestamp_millis(),
                    }),
                )
                .await;
            true
        }
    }
}

/// 독립적인 WebSocket 라우터 생성.
pub fn websocket_router(ws_state: WsState) -> Router {
    Router::new()
        .route("/", get(websocket_handler))
        .with_state(ws_state)
}
