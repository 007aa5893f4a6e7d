//! HTTP(S) fetcher backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, instrument, warn};

use docscout_shared::{FetchStatus, RawContent, Result, ScraperConfig, ScraperError};

use crate::{ContentFetcher, FetchOptions, cancellable};

/// Maximum number of redirects followed when redirects are enabled.
const MAX_REDIRECTS: usize = 10;

/// Fetches web resources with retry on transient failures.
pub struct HttpFetcher {
    client: Client,
    /// Same settings but never follows redirects.
    no_redirect_client: Client,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl HttpFetcher {
    /// Create a fetcher from the `[scraper]` config section.
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let build = |policy: reqwest::redirect::Policy| {
            Client::builder()
                .user_agent(config.user_agent.as_str())
                .redirect(policy)
                .timeout(Duration::from_millis(config.page_timeout_ms))
                .build()
                .map_err(|e| ScraperError::Network(format!("failed to build HTTP client: {e}")))
        };

        Ok(Self {
            client: build(reqwest::redirect::Policy::limited(MAX_REDIRECTS))?,
            no_redirect_client: build(reqwest::redirect::Policy::none())?,
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        })
    }

    async fn fetch_once(&self, url: &str, options: &FetchOptions) -> Result<RawContent> {
        let client = if options.follow_redirects {
            &self.client
        } else {
            &self.no_redirect_client
        };

        let response = client
            .get(url)
            .headers(build_headers(options)?)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        let status = response.status();
        if status.as_u16() == 404 || status.as_u16() == 410 {
            debug!(url, status = status.as_u16(), "resource not found");
            return Ok(RawContent::not_found(url));
        }
        if !status.is_success() {
            return Err(ScraperError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let source = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| ScraperError::Network(format!("{url}: body read failed: {e}")))?;

        let (mime_type, charset) = parse_content_type(&content_type);

        Ok(RawContent {
            content: body.to_vec(),
            mime_type,
            source,
            charset,
            status: FetchStatus::Success,
        })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    fn can_fetch(&self, url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<RawContent> {
        let signal = options.signal.as_ref();
        let mut attempt = 0;

        loop {
            match cancellable(signal, self.fetch_once(url, options)).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.retry_base_delay * 2u32.saturating_pow(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying request"
                    );
                    cancellable(signal, async {
                        tokio::time::sleep(delay).await;
                        Ok(())
                    })
                    .await?;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

/// Convert the forwarded header map into a `reqwest` header map.
fn build_headers(options: &FetchOptions) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in &options.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ScraperError::config(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ScraperError::config(format!("invalid value for header {name}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn map_reqwest_error(url: &str, e: reqwest::Error) -> ScraperError {
    if e.is_timeout() {
        ScraperError::Timeout {
            url: url.to_string(),
        }
    } else {
        ScraperError::Network(format!("{url}: {e}"))
    }
}

/// Split `text/html; charset=UTF-8` into (`text/html`, `Some("utf-8")`).
fn parse_content_type(value: &str) -> (String, Option<String>) {
    let mut parts = value.split(';');
    let mime = parts.next().unwrap_or("").trim().to_ascii_lowercase();
    let charset = parts.find_map(|p| {
        let (key, val) = p.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| val.trim().trim_matches('"').to_ascii_lowercase())
    });
    (mime, charset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> ScraperConfig {
        ScraperConfig {
            max_retries: 2,
            retry_base_delay_ms: 1,
            ..ScraperConfig::default()
        }
    }

    #[test]
    fn content_type_parsing() {
        assert_eq!(
            parse_content_type("text/html; charset=\"UTF-8\""),
            ("text/html".to_string(), Some("utf-8".to_string()))
        );
        assert_eq!(
            parse_content_type("application/json"),
            ("application/json".to_string(), None)
        );
    }

    #[tokio::test]
    async fn fetches_body_and_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<h1>Hi</h1>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let url = format!("{}/page", server.uri());
        let raw = fetcher.fetch(&url, &FetchOptions::default()).await.unwrap();

        assert_eq!(raw.status, FetchStatus::Success);
        assert_eq!(raw.mime_type, "text/html");
        assert_eq!(raw.charset.as_deref(), Some("utf-8"));
        assert_eq!(raw.text(), "<h1>Hi</h1>");
        assert_eq!(raw.source, url);
    }

    #[tokio::test]
    async fn not_found_is_a_status_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let raw = fetcher
            .fetch(&format!("{}/missing", server.uri()), &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(raw.status, FetchStatus::NotFound);
    }

    #[tokio::test]
    async fn client_errors_carry_status() {
        let server = MockServer::start().await;
        Mock::given(path("/private"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/private", server.uri()), &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::Http { status: 401, .. }));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/flaky", server.uri()), &FetchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::Http { status: 503, .. }));
    }

    #[tokio::test]
    async fn forwards_headers() {
        let server = MockServer::start().await;
        Mock::given(path("/auth"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let mut options = FetchOptions::default();
        options
            .headers
            .insert("Authorization".into(), "Bearer secret".into());
        let raw = fetcher
            .fetch(&format!("{}/auth", server.uri()), &options)
            .await
            .unwrap();
        assert_eq!(raw.text(), "ok");
    }

    #[tokio::test]
    async fn cancelled_before_response() {
        let server = MockServer::start().await;
        Mock::given(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&test_config()).unwrap();
        let token = docscout_shared::CancellationToken::new();
        let options = FetchOptions {
            signal: Some(token.clone()),
            ..FetchOptions::default()
        };
        let url = format!("{}/slow", server.uri());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });
        let err = fetcher.fetch(&url, &options).await.unwrap_err();
        canceller.await.unwrap();
        assert!(err.is_cancelled());
    }
}
