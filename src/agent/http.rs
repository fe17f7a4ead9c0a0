//! HTTP channel to the Agent.
//!
//! One blocking `reqwest` client shared by session start and the report
//! worker. Every request carries the raw developer token in the
//! `Authorization` header.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use tracing::debug;

use super::types::{AgentError, AgentResult};
use crate::report::queue::ReportUploader;
use crate::report::types::{ReportItem, UploadError, endpoints};

#[derive(Debug, Clone)]
pub struct AgentHttp {
    client: Client,
    base_url: String,
    token: String,
}

impl AgentHttp {
    /// Build a client for the Agent at `base_url`
    ///
    /// `request_timeout` applies to every request unless overridden per call.
    pub fn new(
        base_url: &str,
        token: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> AgentResult<Self> {
        let parsed = reqwest::Url::parse(base_url.trim())
            .map_err(|e| AgentError::Configuration(format!("invalid Agent URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AgentError::Configuration(format!(
                "Agent URL '{base_url}' must use http or https"
            )));
        }

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| AgentError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of an Agent endpoint
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body to an Agent endpoint
    pub fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> reqwest::Result<Response> {
        let mut request = self
            .client
            .post(self.url(path))
            .header(AUTHORIZATION, self.token.as_str())
            .json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        request.send()
    }

    fn post_report<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), UploadError> {
        let response = self
            .post_json(path, body, None)
            .map_err(|e| UploadError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Http {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        debug!(path, status = status.as_u16(), "report delivered");
        Ok(())
    }
}

impl ReportUploader for AgentHttp {
    fn upload(&self, item: &ReportItem) -> Result<(), UploadError> {
        let body = item.body()?;
        self.post_report(item.endpoint(), &body)
    }

    fn upload_batch(&self, items: &[ReportItem]) -> Result<(), UploadError> {
        self.post_report(endpoints::BATCH, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::{StepReport, TestReport};
    use mockito::Matcher;
    use serde_json::json;

    fn http(server: &mockito::Server) -> AgentHttp {
        AgentHttp::new(
            &server.url(),
            "dev-token",
            Duration::from_secs(2),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_url() {
        let err = AgentHttp::new("not a url", "t", Duration::from_secs(1), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));

        let err = AgentHttp::new("ftp://agent", "t", Duration::from_secs(1), Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, AgentError::Configuration(_)));
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let http = AgentHttp::new(
            "http://localhost:8585/",
            "t",
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(http.url(endpoints::TEST), "http://localhost:8585/api/development/report/test");
    }

    #[test]
    fn test_single_report_goes_to_its_endpoint() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", endpoints::TEST)
            .match_header("authorization", "dev-token")
            .match_body(Matcher::Json(json!({"name": "login", "passed": true})))
            .with_status(200)
            .create();

        let item = ReportItem::from(TestReport::new("login", true, None));
        http(&server).upload(&item).unwrap();

        mock.assert();
    }

    #[test]
    fn test_batch_is_a_tagged_array() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", endpoints::BATCH)
            .match_header("authorization", "dev-token")
            .match_body(Matcher::Regex(r#"^\[\{"type":"Test".*"type":"Step""#.to_string()))
            .with_status(200)
            .create();

        let items = vec![
            ReportItem::from(TestReport::new("login", true, None)),
            ReportItem::from(StepReport::new("open", None, true)),
        ];
        http(&server).upload_batch(&items).unwrap();

        mock.assert();
    }

    #[test]
    fn test_non_success_status_is_an_error() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", endpoints::STEP)
            .with_status(500)
            .with_body("agent exploded")
            .create();

        let item = ReportItem::from(StepReport::new("open", None, true));
        let err = http(&server).upload(&item).unwrap_err();

        match err {
            UploadError::Http { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "agent exploded");
            }
            other => panic!("unexpected error {other:?}"),
        }
        mock.assert();
    }
}
