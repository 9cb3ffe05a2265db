//! HTTP transport against an engine speaking the v2 API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;
use url::Url;

use crate::client::{RowStream, TimeSeries};
use crate::csv::decode_annotated_csv;
use crate::error::Error;
use crate::point::Point;

/// Connection settings for [`HttpTimeSeries`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL of the engine, e.g. `http://localhost:8086`.
    pub url: String,
    /// Organization the token is scoped to.
    pub org: String,
    /// API token.
    pub token: String,
    /// Per-request timeout. Callers needing a tighter deadline wrap the
    /// call in their own timeout and drop the future.
    pub timeout: Option<Duration>,
}

/// A [`TimeSeries`] engine reached over HTTP.
pub struct HttpTimeSeries {
    client: reqwest::Client,
    base: Url,
    org: String,
    token: String,
}

impl HttpTimeSeries {
    pub fn new(config: HttpConfig) -> Result<Self, Error> {
        let base = Url::parse(&config.url)
            .map_err(|e| Error::Config(format!("bad engine url {:?}: {e}", config.url)))?;
        if config.org.is_empty() {
            return Err(Error::Config("engine org must not be empty".into()));
        }
        if config.token.is_empty() {
            return Err(Error::Config("engine token must not be empty".into()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;

        Ok(Self { client, base, org: config.org, token: config.token })
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base
            .join(path)
            .map_err(|e| Error::Config(format!("bad engine url join {path:?}: {e}")))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_else(|_| String::new());
        Err(Error::Api { status: status.as_u16(), message })
    }
}

#[async_trait]
impl TimeSeries for HttpTimeSeries {
    async fn write_point(&self, bucket: &str, point: &Point) -> Result<(), Error> {
        // Unstamped points get the submission time, so the engine never
        // assigns server-side timestamps behind our back.
        let stamped;
        let point = if point.timestamp().is_none() {
            stamped = point.clone().at(Utc::now());
            &stamped
        } else {
            point
        };
        let line = point.to_line_protocol()?;
        debug!(measurement = point.measurement(), "writing point");

        let response = self
            .client
            .post(self.endpoint("api/v2/write")?)
            .query(&[("org", self.org.as_str()), ("bucket", bucket), ("precision", "ns")])
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(line)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn query(&self, script: &str) -> Result<RowStream, Error> {
        debug!(script, "executing query");
        let body = serde_json::json!({
            "query": script,
            "dialect": { "header": true, "annotations": ["datatype"], "delimiter": "," },
        });

        let response = self
            .client
            .post(self.endpoint("api/v2/query")?)
            .query(&[("org", self.org.as_str())])
            .header(AUTHORIZATION, format!("Token {}", self.token))
            .header(ACCEPT, "application/csv")
            .json(&body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let text = response.text().await?;
        let rows = decode_annotated_csv(&text)?;
        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str, org: &str, token: &str) -> HttpConfig {
        HttpConfig {
            url: url.to_string(),
            org: org.to_string(),
            token: token.to_string(),
            timeout: Some(Duration::from_secs(10)),
        }
    }

    #[test]
    fn test_rejects_bad_configuration() {
        assert!(matches!(
            HttpTimeSeries::new(config("not a url", "org", "t")),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            HttpTimeSeries::new(config("http://localhost:8086", "", "t")),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            HttpTimeSeries::new(config("http://localhost:8086", "org", "")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_accepts_valid_configuration() {
        assert!(HttpTimeSeries::new(config("http://localhost:8086", "org", "t")).is_ok());
    }
}
