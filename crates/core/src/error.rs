//! 에러 타입 — 도메인별 에러 정의
//!
//! # 에러 분류
//!
//! - **입력 에러** ([`InputError`]): 요청 경계에서 즉시 거부되며 스캔 리포트에 나타나지 않습니다.
//! - **백엔드 에러** ([`BackendError`]): 대상(target) 단위로 격리되어 리포트의 `errors`에 기록됩니다.
//! - **설정/데이터셋 에러** ([`ConfigError`], [`DatasetError`]): 시작 시점에 발생합니다.

/// netsync 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum NetsyncError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 요청 입력 에러
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// 디스커버리 데이터셋 에러
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// 인벤토리 백엔드 에러
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 요청 입력 에러
///
/// 대상 확장 이전에 발생하며, 어떤 디스커버리 조회도 일어나기 전에 요청을 거부합니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// CIDR 표기가 잘못됨
    #[error("invalid CIDR '{input}': {reason}")]
    InvalidCidr { input: String, reason: String },

    /// 명시적 주소 목록에 IP가 아닌 값이 포함됨
    #[error("invalid address '{input}'")]
    InvalidAddress { input: String },

    /// 대상 범위가 허용 상한을 초과
    #[error("range too large: {size} addresses (max: {max})")]
    RangeTooLarge { size: u128, max: usize },

    /// cidr, ips 모두 비어 있음
    #[error("no targets provided (ips or cidr)")]
    NoTargets,

    /// 장치 이름 접두어가 허용되지 않는 형식
    #[error("invalid name prefix '{prefix}': {reason}")]
    InvalidNamePrefix { prefix: String, reason: String },
}

impl InputError {
    /// API 응답용 고정 에러 코드를 반환합니다.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCidr { .. } => "InvalidCIDR",
            Self::InvalidAddress { .. } => "InvalidAddress",
            Self::RangeTooLarge { .. } => "RangeTooLarge",
            Self::NoTargets => "NoTargets",
            Self::InvalidNamePrefix { .. } => "InvalidNamePrefix",
        }
    }
}

/// 디스커버리 데이터셋 에러
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// 파일 로딩 실패
    #[error("failed to load dataset {path}: {reason}")]
    Load { path: String, reason: String },

    /// JSON 파싱 실패
    #[error("failed to parse dataset: {0}")]
    Parse(String),

    /// 개별 엔트리 검증 실패
    #[error("invalid dataset entry '{address}': {reason}")]
    InvalidEntry { address: String, reason: String },
}

/// 인벤토리 백엔드 에러 (대상 단위로 격리됨)
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// 호출 타임아웃
    #[error("backend timeout: {0}")]
    Timeout(String),

    /// 백엔드 연결 불가 또는 비정상 응답
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// 인벤토리 상태 충돌 (중복 생성 등)
    #[error("conflicting state: {0}")]
    ConflictingState(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_error_codes_match_api_contract() {
        let cases = [
            (
                InputError::InvalidCidr {
                    input: "x".to_owned(),
                    reason: "bad".to_owned(),
                },
                "InvalidCIDR",
            ),
            (
                InputError::InvalidAddress {
                    input: "x".to_owned(),
                },
                "InvalidAddress",
            ),
            (InputError::RangeTooLarge { size: 10, max: 5 }, "RangeTooLarge"),
            (InputError::NoTargets, "NoTargets"),
            (
                InputError::InvalidNamePrefix {
                    prefix: " ".to_owned(),
                    reason: "whitespace".to_owned(),
                },
                "InvalidNamePrefix",
            ),
        ];
        for (err, code) in cases {
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn range_too_large_display_includes_bounds() {
        let err = InputError::RangeTooLarge {
            size: 65536,
            max: 1024,
        };
        let msg = err.to_string();
        assert!(msg.contains("65536"));
        assert!(msg.contains("1024"));
    }

    #[test]
    fn input_error_converts_to_netsync_error() {
        let err: NetsyncError = InputError::NoTargets.into();
        assert!(matches!(err, NetsyncError::Input(InputError::NoTargets)));
    }

    #[test]
    fn dataset_entry_error_display() {
        let err = DatasetError::InvalidEntry {
            address: "10.0.0.1".to_owned(),
            reason: "duplicate interface 'eth0'".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("10.0.0.1"));
        assert!(msg.contains("eth0"));
    }

    #[test]
    fn backend_error_converts_to_netsync_error() {
        let err: NetsyncError = BackendError::Timeout("find_device".to_owned()).into();
        assert!(err.to_string().contains("find_device"));
    }
}
