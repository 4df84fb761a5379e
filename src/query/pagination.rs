use serde::Serialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn skip(&self) -> u64 {
        (u64::from(self.page) - 1) * u64::from(self.limit)
    }

    pub fn take(&self) -> u64 {
        u64::from(self.limit)
    }
}

/// Missing or non-numeric values fall back to the defaults, numeric values
/// are clamped (page >= 1, limit in 1..=100).
pub fn parse_pagination(page: Option<&str>, limit: Option<&str>) -> Pagination {
    let page = page
        .and_then(|p| p.trim().parse::<i64>().ok())
        .map(|p| p.clamp(1, i64::from(u32::MAX)) as u32)
        .unwrap_or(DEFAULT_PAGE);
    let limit = limit
        .and_then(|l| l.trim().parse::<i64>().ok())
        .map(|l| l.clamp(1, i64::from(MAX_LIMIT)) as u32)
        .unwrap_or(DEFAULT_LIMIT);
    Pagination { page, limit }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        let p = parse_pagination(None, None);
        assert_eq!(p, Pagination { page: 1, limit: 10 });
        assert_eq!(p.skip(), 0);
        assert_eq!(p.take(), 10);
    }

    #[test]
    fn test_defaults_when_not_numeric() {
        assert_eq!(
            parse_pagination(Some("two"), Some("lots")),
            Pagination { page: 1, limit: 10 }
        );
    }

    #[test]
    fn test_skip_is_page_minus_one_times_limit() {
        for page in 1..=20u32 {
            for limit in [1u32, 7, 10, 50, 100] {
                let p = parse_pagination(Some(&page.to_string()), Some(&limit.to_string()));
                assert_eq!(p.skip(), u64::from((page - 1) * limit));
                assert_eq!(p.take(), u64::from(limit));
            }
        }
    }

    #[test]
    fn test_page_clamps_to_one() {
        assert_eq!(parse_pagination(Some("0"), None).page, 1);
        assert_eq!(parse_pagination(Some("-4"), None).page, 1);
    }

    #[test]
    fn test_limit_clamps_to_range() {
        assert_eq!(parse_pagination(None, Some("500")).limit, 100);
        assert_eq!(parse_pagination(None, Some("0")).limit, 1);
        assert_eq!(parse_pagination(None, Some("-3")).limit, 1);
    }
}
