//! # 分页游标
//!
//! 游标对调用方不透明：资源类型标签 + 条目偏移，JSON 后 base64 编码。
//! 所有资源类型使用同一个固定页大小。

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::client::PaginationVars;
use crate::error::{ConnectorError, Result};

/// 每页条目数
pub const PAGE_SIZE: u32 = 50;

/// 解码后的游标状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub resource_type: String,
    pub offset: u32,
}

impl PageCursor {
    #[must_use]
    pub fn start(resource_type: &str) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            offset: 0,
        }
    }

    /// 解码页令牌
    ///
    /// 空令牌从偏移 0 开始；令牌格式错误或类型标签不符都会报错。
    pub fn decode(token: &str, resource_type: &str) -> Result<Self> {
        if token.is_empty() {
            return Ok(Self::start(resource_type));
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| ConnectorError::pagination_with_source("not base64", e))?;
        let cursor: Self = serde_json::from_slice(&bytes)
            .map_err(|e| ConnectorError::pagination_with_source("malformed cursor", e))?;

        if cursor.resource_type != resource_type {
            return Err(ConnectorError::pagination(format!(
                "cursor belongs to {}, expected {resource_type}",
                cursor.resource_type
            )));
        }
        Ok(cursor)
    }

    pub fn encode(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| ConnectorError::internal_with_source("failed to encode page cursor", e))?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// 当前页的请求参数
    #[must_use]
    pub fn page(&self) -> PaginationVars {
        PaginationVars::new(PAGE_SIZE, self.offset)
    }

    /// 根据响应中的总数生成下一页令牌，没有更多页时为空串
    pub fn next_token(&self, total: u32) -> Result<String> {
        match next_offset(self.offset, total) {
            Some(offset) => Self {
                resource_type: self.resource_type.clone(),
                offset,
            }
            .encode(),
            None => Ok(String::new()),
        }
    }
}

/// 下一页的偏移；`total` 为 0 或下一页已越过总数时返回 `None`
#[must_use]
pub fn next_offset(offset: u32, total: u32) -> Option<u32> {
    if total == 0 {
        return None;
    }
    let next = offset.checked_add(PAGE_SIZE)?;
    (next < total).then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn empty_token_starts_at_zero() {
        let cursor = PageCursor::decode("", "user").unwrap();
        assert_eq!(cursor, PageCursor::start("user"));
        assert_eq!(cursor.page(), PaginationVars::new(PAGE_SIZE, 0));
    }

    #[rstest]
    #[case(0, 0, None)]
    #[case(0, 50, None)]
    #[case(0, 51, Some(50))]
    #[case(50, 100, None)]
    #[case(50, 101, Some(100))]
    #[case(u32::MAX - 10, u32::MAX, None)]
    fn next_offset_table(#[case] offset: u32, #[case] total: u32, #[case] expected: Option<u32>) {
        assert_eq!(next_offset(offset, total), expected);
    }

    #[test]
    fn malformed_token_is_error() {
        let err = PageCursor::decode("%%%", "user").unwrap_err();
        assert!(matches!(err, ConnectorError::Pagination { .. }));

        let not_json = URL_SAFE_NO_PAD.encode(b"42");
        assert!(PageCursor::decode(&not_json, "user").is_err());
    }

    #[test]
    fn token_for_other_type_is_rejected() {
        let token = PageCursor::start("role").next_token(500).unwrap();
        let err = PageCursor::decode(&token, "group").unwrap_err();
        assert!(err.to_string().contains("expected group"));
    }

    proptest! {
        #[test]
        fn encode_decode_advances_one_page(offset in 0u32..1_000_000, total in 0u32..2_000_000) {
            let cursor = PageCursor { resource_type: "user".to_string(), offset };
            let token = cursor.next_token(total).unwrap();

            if total == 0 || offset + PAGE_SIZE >= total {
                prop_assert!(token.is_empty());
            } else {
                let next = PageCursor::decode(&token, "user").unwrap();
                prop_assert_eq!(next.offset, offset + PAGE_SIZE);
            }
        }
    }
}
