//! WebSocket 메시지 타입.
//!
//! 클라이언트-서버 간 교환되는 메시지 정의.

use dash_core::{MarketQuote, PcrSnapshot, Sentiment};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// WebSocket 에러.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    #[error("잘못된 메시지 형식: {0}")]
    InvalidMessage(String),
    #[error("직렬화 실패: {0}")]
    SerializationError(#[from] serde_json::Error),
}

// ==================== 클라이언트 → 서버 메시지 ====================

/// 클라이언트에서 서버로 보내는 메시지.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// 심볼 구독. 기존 구독 집합을 통째로 교체합니다.
    Subscribe {
        /// 구독할 심볼 목록
        symbols: Vec<String>,
    },
    /// 전체 구독 해제
    Unsubscribe,
    /// 핑 (연결 유지)
    Ping,
}

impl ClientMessage {
    /// JSON 문자열에서 파싱.
    pub fn from_json(json: &str) -> Result<Self, WsError> {
        serde_json::from_str(json).map_err(|e| WsError::InvalidMessage(e.to_string()))
    }
}

// ==================== 서버 → 클라이언트 메시지 ====================

/// 서버에서 클라이언트로 보내는 메시지.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// 연결 수립 확인
    ConnectionEstablished {
        /// 안내 메시지
        message: String,
        /// 서버 타임스탬프 (밀리초)
        timestamp: i64,
    },
    /// 구독 확인. 교체 후의 전체 유효 목록을 돌려줍니다.
    SubscriptionConfirmed {
        /// 현재 구독 중인 심볼 목록
        symbols: Vec<String>,
    },
    /// 구독 해제 확인
    UnsubscriptionConfirmed,
    /// 퐁 응답
    Pong {
        /// 서버 타임스탬프 (밀리초)
        timestamp: i64,
    },
    /// 에러
    Error {
        /// 에러 코드
        code: String,
        /// 에러 메시지
        message: String,
    },
    /// 시세 업데이트. 연결별로 구독 집합에 맞게 필터링되어 전송됩니다.
    MarketUpdate {
        /// 서버 타임스탬프 (밀리초)
        timestamp: i64,
        /// 심볼별 시세
        data: HashMap<String, MarketQuote>,
    },
    /// PCR 업데이트 (필터링 없음)
    PcrUpdate {
        /// 기초자산 심볼
        symbol: String,
        /// 서버 타임스탬프 (밀리초)
        timestamp: i64,
        /// PCR 스냅샷
        data: PcrSnapshot,
    },
    /// 시장 심리 업데이트 (필터링 없음)
    SentimentUpdate {
        /// 서버 타임스탬프 (밀리초)
        timestamp: i64,
        /// 심볼별 심리
        data: HashMap<String, Sentiment>,
    },
}

impl ServerMessage {
    /// JSON 문자열로 직렬화.
    pub fn to_json(&self) -> Result<String, WsError> {
        serde_json::to_string(self).map_err(WsError::from)
    }

    /// 에러 메시지 생성 헬퍼.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}
