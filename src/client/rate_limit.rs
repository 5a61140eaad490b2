//! # 速率限制信息提取
//!
//! 从响应头解析 Aruba Central 网关的秒级/日级配额，生成 `RateLimitSnapshot`。
//! 这里只做描述，不做限流：`OverLimit` 只是随结果返回的元数据。

use chrono::{DateTime, Duration, SubsecRound, Utc};
use reqwest::StatusCode;
use reqwest::header::{DATE, HeaderMap};
use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, Result};

pub const LIMIT_SECOND_HEADER: &str = "X-Ratelimit-Limit-second";
pub const LIMIT_DAY_HEADER: &str = "X-Ratelimit-Limit-day";
pub const REMAINING_SECOND_HEADER: &str = "X-Ratelimit-Remaining-second";
pub const REMAINING_DAY_HEADER: &str = "X-Ratelimit-Remaining-day";

const RATE_LIMIT_HEADERS: [&str; 4] = [
    LIMIT_SECOND_HEADER,
    LIMIT_DAY_HEADER,
    REMAINING_SECOND_HEADER,
    REMAINING_DAY_HEADER,
];

/// 配额状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RateLimitStatus {
    Ok,
    OverLimit,
}

/// 单次响应的速率限制快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub status: RateLimitStatus,
    pub limit: i64,
    pub remaining: i64,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitSnapshot {
    #[must_use]
    pub fn is_over_limit(&self) -> bool {
        self.status == RateLimitStatus::OverLimit
    }
}

/// 解析一个数字响应头；缺失视为 0，存在但无法解析则报错
fn numeric_header(headers: &HeaderMap, name: &str) -> Result<i64> {
    let Some(value) = headers.get(name) else {
        return Ok(0);
    };
    let text = value
        .to_str()
        .map_err(|e| ConnectorError::decode_with_source(format!("header {name} is not ASCII"), e))?;
    if text.is_empty() {
        return Ok(0);
    }
    text.trim().parse::<i64>().map_err(|e| {
        ConnectorError::decode_with_source(format!("header {name} is not a number: {text:?}"), e)
    })
}

/// 以响应自身的 `Date` 头计算下一个 UTC 零点
fn next_day_boundary(headers: &HeaderMap) -> Result<DateTime<Utc>> {
    let raw = headers
        .get(DATE)
        .ok_or_else(|| ConnectorError::decode("missing Date header"))?
        .to_str()
        .map_err(|e| ConnectorError::decode_with_source("Date header is not ASCII", e))?;

    let date = DateTime::parse_from_rfc2822(raw)
        .map_err(|e| ConnectorError::decode_with_source(format!("invalid Date header: {raw:?}"), e))?
        .with_timezone(&Utc)
        .date_naive();

    date.succ_opt()
        .and_then(|next| next.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| ConnectorError::decode(format!("Date header out of range: {raw:?}")))
}

fn next_second_boundary(now: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(0) + Duration::seconds(1)
}

/// 从状态码和响应头提取速率限制快照
///
/// 判断顺序固定：秒级耗尽 → 日级耗尽 → 正常（报告日级配额）。
/// 四个配额头都不存在且不是 429 时返回 `None`。
pub fn extract_rate_limit(status: StatusCode, headers: &HeaderMap) -> Result<Option<RateLimitSnapshot>> {
    extract_rate_limit_at(status, headers, Utc::now())
}

/// 同 [`extract_rate_limit`]，秒级重置时间以 `now` 为基准
pub fn extract_rate_limit_at(
    status: StatusCode,
    headers: &HeaderMap,
    now: DateTime<Utc>,
) -> Result<Option<RateLimitSnapshot>> {
    let present = RATE_LIMIT_HEADERS.iter().any(|h| headers.contains_key(*h));
    if !present && status != StatusCode::TOO_MANY_REQUESTS {
        return Ok(None);
    }

    let limit_second = numeric_header(headers, LIMIT_SECOND_HEADER)?;
    let limit_day = numeric_header(headers, LIMIT_DAY_HEADER)?;
    let remaining_second = numeric_header(headers, REMAINING_SECOND_HEADER)?;
    let remaining_day = numeric_header(headers, REMAINING_DAY_HEADER)?;

    let snapshot = if remaining_second == 0 {
        RateLimitSnapshot {
            status: RateLimitStatus::OverLimit,
            limit: limit_second,
            remaining: remaining_second,
            reset_at: next_second_boundary(now),
        }
    } else if remaining_day == 0 {
        RateLimitSnapshot {
            status: RateLimitStatus::OverLimit,
            limit: limit_day,
            remaining: remaining_day,
            reset_at: next_day_boundary(headers)?,
        }
    } else {
        RateLimitSnapshot {
            status: RateLimitStatus::Ok,
            limit: limit_day,
            remaining: remaining_day,
            reset_at: next_day_boundary(headers)?,
        }
    };

    Ok(Some(snapshot))
}
