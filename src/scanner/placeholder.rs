use anyhow::Result;

use crate::http::PayloadRequest;

const PARAM_NAME: &str = "test";
const HEADER_NAME: &str = "X-Payload";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    UrlParam,
    UrlPath,
    Header,
    RequestBody,
    Graphql,
}

impl Placeholder {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().replace(['-', '_'], "").as_str() {
            "urlparam" => Ok(Placeholder::UrlParam),
            "urlpath" => Ok(Placeholder::UrlPath),
            "header" => Ok(Placeholder::Header),
            "requestbody" => Ok(Placeholder::RequestBody),
            "graphql" => Ok(Placeholder::Graphql),
            other => anyhow::bail!("unknown placeholder: {other}"),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Placeholder::UrlParam => "url-param",
            Placeholder::UrlPath => "url-path",
            Placeholder::Header => "header",
            Placeholder::RequestBody => "request-body",
            Placeholder::Graphql => "graphql",
        }
    }

    // Places the already-encoded payload into one spot of an otherwise
    // innocuous request against the target.
    pub fn build(&self, base_url: &str, graphql_url: &str, payload: &str) -> PayloadRequest {
        let base = base_url.trim_end_matches('/');

        match self {
            Placeholder::UrlParam => PayloadRequest {
                method: "GET".to_string(),
                url: format!("{base}/?{PARAM_NAME}={payload}"),
                report_path: "/".to_string(),
                headers: Vec::new(),
                body: None,
                content_type: None,
            },
            Placeholder::UrlPath => PayloadRequest {
                method: "GET".to_string(),
                url: format!("{base}/{payload}"),
                report_path: format!("/{payload}"),
                headers: Vec::new(),
                body: None,
                content_type: None,
            },
            Placeholder::Header => PayloadRequest {
                method: "GET".to_string(),
                url: format!("{base}/"),
                report_path: "/".to_string(),
                headers: vec![(HEADER_NAME.to_string(), payload.to_string())],
                body: None,
                content_type: None,
            },
            Placeholder::RequestBody => PayloadRequest {
                method: "POST".to_string(),
                url: format!("{base}/"),
                report_path: "/".to_string(),
                headers: Vec::new(),
                body: Some(format!("{PARAM_NAME}={payload}")),
                content_type: Some("application/x-www-form-urlencoded"),
            },
            Placeholder::Graphql => {
                let query = serde_json::json!({
                    "query": format!("query {{ search(q: \"{}\") {{ id }} }}", payload.replace('"', "\\\"")),
                });
                let url = graphql_url.to_string();
                let report_path = reqwest::Url::parse(&url)
                    .map(|u| u.path().to_string())
                    .unwrap_or_else(|_| "/graphql".to_string());
                PayloadRequest {
                    method: "POST".to_string(),
                    url,
                    report_path,
                    headers: Vec::new(),
                    body: Some(query.to_string()),
                    content_type: Some("application/json"),
                }
            }
        }
    }
}
