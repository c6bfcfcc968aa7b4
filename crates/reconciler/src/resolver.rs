//! 대상 확장 — CIDR 범위와 명시적 주소 목록을 스캔 대상 집합으로 변환
//!
//! 모든 검증은 디스커버리 조회 이전에 수행됩니다. 실패는 [`InputError`]로
//! 반환되어 요청 전체를 거부하며, 스캔 리포트에는 나타나지 않습니다.
//!
//! # 확장 규칙
//! - 네트워크 주소와 브로드캐스트 주소를 포함한 전체 범위
//! - 호스트 비트가 설정된 입력 허용 (`192.168.1.5/29` → `192.168.1.0`~`.7`)
//! - 프리픽스 없는 주소는 단일 대상
//! - 범위 크기는 확장 전에 상한과 비교

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::IpNetwork;
use netsync_core::error::InputError;
use serde::{Deserialize, Serialize};

/// 장치 이름 접두어 최대 길이
pub const MAX_NAME_PREFIX_LEN: usize = 64;

/// 스캔 요청
///
/// HTTP 요청 본문 `{ cidr?, ips?, name_prefix? }`과 동일한 형식입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// 스캔할 CIDR 범위
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    /// 명시적 주소 목록
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ips: Option<Vec<String>>,
    /// 생성/조회 시 호스트명 앞에 붙일 접두어
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
}

/// 검증이 끝난 스캔 요청
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScan {
    /// 중복 없는 순서 있는 대상 목록
    pub targets: Vec<IpAddr>,
    /// 검증된 접두어 (비어 있으면 `None`)
    pub name_prefix: Option<String>,
}

impl ScanRequest {
    /// 요청을 검증하고 대상 목록으로 확장합니다.
    pub fn resolve(&self, max_targets: usize) -> Result<ResolvedScan, InputError> {
        let name_prefix = validate_name_prefix(self.name_prefix.as_deref())?;
        let targets = merge_targets(self.cidr.as_deref(), self.ips.as_deref(), max_targets)?;
        Ok(ResolvedScan {
            targets,
            name_prefix,
        })
    }
}

/// CIDR 범위를 주소 목록으로 확장합니다.
///
/// 반환 순서는 주소 오름차순입니다.
pub fn resolve_cidr(cidr: &str, max_targets: usize) -> Result<Vec<IpAddr>, InputError> {
    let trimmed = cidr.trim();
    let network: IpNetwork = trimmed.parse().map_err(|e| InputError::InvalidCidr {
        input: cidr.to_owned(),
        reason: format!("{e}"),
    })?;

    let size = range_size(&network);
    if size > max_targets as u128 {
        return Err(InputError::RangeTooLarge {
            size,
            max: max_targets,
        });
    }

    // size <= max_targets 이므로 이하 변환은 손실이 없음
    let count = size as u64;
    let targets = match network {
        IpNetwork::V4(net) => {
            let base = u32::from(net.network());
            (0..count)
                .map(|offset| IpAddr::V4(Ipv4Addr::from(base.wrapping_add(offset as u32))))
                .collect()
        }
        IpNetwork::V6(net) => {
            let base = u128::from(net.network());
            (0..count)
                .map(|offset| IpAddr::V6(Ipv6Addr::from(base.wrapping_add(u128::from(offset)))))
                .collect()
        }
    };
    Ok(targets)
}

/// 범위에 포함된 주소 수 (IPv6 /0처럼 u128을 넘으면 포화)
fn range_size(network: &IpNetwork) -> u128 {
    let total_bits: u32 = match network {
        IpNetwork::V4(_) => 32,
        IpNetwork::V6(_) => 128,
    };
    let host_bits = total_bits - u32::from(network.prefix());
    1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
}

/// CIDR 범위와 명시적 목록을 병합합니다.
///
/// 첫 등장 순서를 유지하며 (CIDR 주소 먼저, 이어서 명시적 목록) 중복을 제거합니다.
pub fn merge_targets(
    cidr: Option<&str>,
    ips: Option<&[String]>,
    max_targets: usize,
) -> Result<Vec<IpAddr>, InputError> {
    let cidr = cidr.filter(|c| !c.trim().is_empty());
    let ips = ips.unwrap_or_default();

    if cidr.is_none() && ips.is_empty() {
        return Err(InputError::NoTargets);
    }

    let from_cidr = match cidr {
        Some(cidr) => resolve_cidr(cidr, max_targets)?,
        None => Vec::new(),
    };

    let mut explicit = Vec::with_capacity(ips.len());
    for raw in ips {
        let addr: IpAddr = raw.trim().parse().map_err(|_| InputError::InvalidAddress {
            input: raw.clone(),
        })?;
        explicit.push(addr);
    }

    let mut seen = HashSet::with_capacity(from_cidr.len() + explicit.len());
    let merged: Vec<IpAddr> = from_cidr
        .into_iter()
        .chain(explicit)
        .filter(|addr| seen.insert(*addr))
        .collect();

    if merged.len() > max_targets {
        return Err(InputError::RangeTooLarge {
            size: merged.len() as u128,
            max: max_targets,
        });
    }

    Ok(merged)
}

/// 장치 이름 접두어를 검증합니다.
///
/// 빈 문자열은 접두어 없음으로 취급합니다.
pub fn validate_name_prefix(prefix: Option<&str>) -> Result<Option<String>, InputError> {
    let Some(prefix) = prefix.filter(|p| !p.is_empty()) else {
        return Ok(None);
    };

    if prefix.chars().count() > MAX_NAME_PREFIX_LEN {
        return Err(InputError::InvalidNamePrefix {
            prefix: prefix.to_owned(),
            reason: format!("must be at most {MAX_NAME_PREFIX_LEN} characters"),
        });
    }

    if prefix.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(InputError::InvalidNamePrefix {
            prefix: prefix.to_owned(),
            reason: "must not contain whitespace or control characters".to_owned(),
        });
    }

    Ok(Some(prefix.to_owned()))
}
