//! 조정 엔진 에러 타입
//!
//! [`InventoryError`]는 인벤토리 백엔드 호출에서 발생하는 모든 에러를 표현합니다.
//! 엔진은 이 에러를 대상 경계에서 잡아 리포트의 `errors`에 기록하며,
//! 다른 대상의 처리를 중단시키지 않습니다.
//!
//! `From<InventoryError> for NetsyncError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use netsync_core::error::{BackendError, NetsyncError};

/// 인벤토리 백엔드 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// 호출이 제한 시간 내에 끝나지 않음
    #[error("inventory {operation} timed out after {timeout_ms}ms")]
    BackendTimeout {
        /// 호출 종류
        operation: String,
        /// 적용된 타임아웃 (밀리초)
        timeout_ms: u64,
    },

    /// 연결 실패 또는 서버 측 장애
    #[error("inventory unavailable: {0}")]
    BackendUnavailable(String),

    /// 백엔드가 요청을 거부함 (4xx/5xx)
    #[error("inventory rejected {operation} (HTTP {status}): {body}")]
    BackendRejected {
        /// 호출 종류
        operation: String,
        /// HTTP 상태 코드
        status: u16,
        /// 응답 본문 (잘림)
        body: String,
    },

    /// 인벤토리 상태가 예상과 다름 (중복 이름, 동시 생성 충돌 등)
    #[error("conflicting inventory state: {0}")]
    ConflictingState(String),

    /// 응답을 해석할 수 없음
    #[error("invalid inventory response: {0}")]
    InvalidResponse(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl InventoryError {
    /// 로그/메트릭 태그용 고정된 에러 종류명을 반환합니다.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BackendTimeout { .. } => "timeout",
            Self::BackendUnavailable(_) => "unavailable",
            Self::BackendRejected { .. } => "rejected",
            Self::ConflictingState(_) => "conflict",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Config { .. } => "config",
        }
    }

    /// 재시도로 회복될 수 있는 일시적 장애인지 판단합니다.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::BackendTimeout { .. } | Self::BackendUnavailable(_) => true,
            Self::BackendRejected { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<InventoryError> for NetsyncError {
    fn from(err: InventoryError) -> Self {
        match &err {
            InventoryError::BackendTimeout { .. } => {
                NetsyncError::Backend(BackendError::Timeout(err.to_string()))
            }
            InventoryError::ConflictingState(msg) => {
                NetsyncError::Backend(BackendError::ConflictingState(msg.clone()))
            }
            InventoryError::BackendUnavailable(_)
            | InventoryError::BackendRejected { .. }
            | InventoryError::InvalidResponse(_)
            | InventoryError::Config { .. } => {
                NetsyncError::Backend(BackendError::Unavailable(err.to_string()))
            }
        }
    }
}
