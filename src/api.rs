use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use engagement_metrics::{CompareEntry, Error, SyncReport};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub username: Option<String>,
}

impl AnalyzeRequest {
    pub fn into_handle(self) -> Result<String, Error> {
        let username = self.username.unwrap_or_default();
        if username.trim().is_empty() {
            return Err(Error::InvalidRequest("username is required".to_string()));
        }
        Ok(username)
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub ok: bool,
    pub username: String,
    pub profile_id: Uuid,
    pub tweets_processed: usize,
}

impl From<SyncReport> for AnalyzeResponse {
    fn from(report: SyncReport) -> Self {
        Self {
            ok: true,
            username: report.handle,
            profile_id: report.account_id,
            tweets_processed: report.posts_processed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub users: Option<String>,
    pub n: Option<String>,
    pub autofill: Option<String>,
}

impl CompareQuery {
    /// Leading signed integer of `n`, so `50abc` reads as 50. Values without
    /// leading digits fall back to the configured default.
    pub fn requested_posts(&self) -> Option<i64> {
        self.n.as_deref().and_then(leading_integer)
    }

    pub fn autofill(&self) -> bool {
        matches!(
            self.autofill.as_deref().map(str::trim),
            Some("1") | Some("true")
        )
    }
}

fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return None;
    }
    let value = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

#[derive(Debug, Deserialize)]
pub struct DiagnoseQuery {
    pub username: Option<String>,
}

impl DiagnoseQuery {
    /// Defaults to a well-known account so the endpoint works without input.
    pub fn into_handle(self) -> String {
        self.username
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "jack".to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub ok: bool,
    pub n: usize,
    pub results: Vec<CompareEntry>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub ok: bool,
    pub error: String,
}

pub fn error_response(err: Error) -> (StatusCode, axum::Json<ApiError>) {
    let status = match &err {
        Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        Error::AccountNotFound(_) => StatusCode::NOT_FOUND,
        Error::UpstreamExhausted { .. } | Error::Upstream(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        axum::Json(ApiError {
            ok: false,
            error: err.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_query_flags() {
        let query = CompareQuery {
            users: Some("a,b".to_string()),
            n: Some("abc".to_string()),
            autofill: Some("true".to_string()),
        };
        assert_eq!(query.requested_posts(), None);
        assert!(query.autofill());

        let query = CompareQuery {
            users: None,
            n: Some("50".to_string()),
            autofill: Some("yes".to_string()),
        };
        assert_eq!(query.requested_posts(), Some(50));
        assert!(!query.autofill());
    }

    #[test]
    fn post_count_reads_leading_integer() {
        assert_eq!(leading_integer("50abc"), Some(50));
        assert_eq!(leading_integer(" -5"), Some(-5));
        assert_eq!(leading_integer("+20"), Some(20));
        assert_eq!(leading_integer("abc"), None);
        assert_eq!(leading_integer("-"), None);
        assert_eq!(leading_integer("99999999999999999999"), Some(i64::MAX));
    }

    #[test]
    fn errors_map_to_status_codes() {
        let (status, _) = error_response(Error::InvalidRequest("x".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = error_response(Error::AccountNotFound("x".to_string()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = error_response(Error::Persistence("x".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn blank_username_is_rejected() {
        let request = AnalyzeRequest {
            username: Some("  ".to_string()),
        };
        assert!(matches!(request.into_handle(), Err(Error::InvalidRequest(_))));
    }
}
