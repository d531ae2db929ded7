use std::error::Error as _;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, Proxy, redirect::Policy};

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct PayloadRequest {
    pub method: String,
    pub url: String,
    pub report_path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub content_type: Option<&'static str>,
}

#[derive(Debug)]
pub struct WafResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug)]
pub enum RequestOutcome {
    Response(WafResponse),
    ConnReset,
    Failed(Vec<String>),
}

pub struct HttpClient {
    client: Client,
    extra_headers: Vec<(String, String)>,
}

impl HttpClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(config.idle_conn_timeout))
            .redirect(Policy::limited(config.max_redirects))
            .danger_accept_invalid_certs(!config.tls_verify);

        if !config.proxy.is_empty() {
            builder = builder.proxy(Proxy::all(&config.proxy).context("invalid proxy URL")?);
        }

        let client = builder.build().context("Failed to create HTTP client")?;

        let mut extra_headers: Vec<(String, String)> = config
            .http_headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        if let Some(header) = parse_header_flag(&config.add_header) {
            extra_headers.push(header);
        }

        Ok(Self {
            client,
            extra_headers,
        })
    }

    pub async fn execute(&self, request: &PayloadRequest) -> RequestOutcome {
        let method = match Method::from_bytes(request.method.as_bytes()) {
            Ok(method) => method,
            Err(err) => return RequestOutcome::Failed(vec![format!("invalid method: {err}")]),
        };

        let mut builder = self.client.request(method, &request.url);

        for (name, value) in &self.extra_headers {
            builder = builder.header(name, value);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(content_type) = request.content_type {
            builder = builder.header("Content-Type", content_type);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        match builder.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                RequestOutcome::Response(WafResponse { status, body })
            }
            Err(err) if is_conn_reset(&err) => RequestOutcome::ConnReset,
            Err(err) => RequestOutcome::Failed(error_chain(&err)),
        }
    }
}

// "Name: value" as accepted on the command line.
fn parse_header_flag(raw: &str) -> Option<(String, String)> {
    if raw.is_empty() {
        return None;
    }
    let (name, value) = raw.split_once(':')?;
    Some((name.trim().to_string(), value.trim().to_string()))
}

fn is_conn_reset(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<std::io::Error>() {
            if matches!(
                io_err.kind(),
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe
            ) {
                return true;
            }
        }
        source = inner.source();
    }
    err.to_string().contains("connection reset")
}

fn error_chain(err: &reqwest::Error) -> Vec<String> {
    let mut reasons = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        reasons.push(inner.to_string());
        source = inner.source();
    }
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_flag() {
        assert_eq!(
            parse_header_flag("X-Scanner: wafscan"),
            Some(("X-Scanner".to_string(), "wafscan".to_string()))
        );
        assert_eq!(parse_header_flag(""), None);
        assert_eq!(parse_header_flag("no-colon"), None);
    }

    #[test]
    fn test_client_builds_from_default_config() {
        let config = Config {
            url: "http://localhost:8080".to_string(),
            ..Config::default()
        };
        assert!(HttpClient::new(&config).is_ok());
    }

    #[test]
    fn test_client_rejects_bad_proxy() {
        let config = Config {
            proxy: "not a proxy url".to_string(),
            ..Config::default()
        };
        assert!(HttpClient::new(&config).is_err());
    }
}
