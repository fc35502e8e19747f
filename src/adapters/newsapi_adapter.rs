//! NewsAPI `/v2/everything` headline search.

use std::time::Duration;

use serde::Deserialize;

use crate::domain::error::DataError;
use crate::ports::news_port::{Headline, NewsPort, NewsQuery};

const BASE_URL: &str = "https://newsapi.org";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    articles: Vec<Article>,
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
}

pub struct NewsApiAdapter {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

impl NewsApiAdapter {
    pub fn new(api_key: String) -> Result<Self, DataError> {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| DataError::unreachable(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl NewsPort for NewsApiAdapter {
    fn search(&self, query: &NewsQuery) -> Result<Vec<Headline>, DataError> {
        let page_size = query.limit.to_string();
        let response = self
            .client
            .get(format!("{}/v2/everything", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("q", query.query.as_str()),
                ("language", query.language.as_str()),
                ("sortBy", query.sort_by.as_str()),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .map_err(|e| DataError::unreachable(e.to_string()))?;

        let body = response
            .text()
            .map_err(|e| DataError::unreachable(e.to_string()))?;
        parse_everything(&body)
    }
}

/// NewsAPI reports failures in the body (`status: "error"`) alongside the
/// HTTP status, so the body alone decides.
pub fn parse_everything(body: &str) -> Result<Vec<Headline>, DataError> {
    let resp: EverythingResponse = serde_json::from_str(body)
        .map_err(|e| DataError::malformed(format!("news JSON: {e}")))?;

    if resp.status != "ok" {
        return Err(DataError::unreachable(format!(
            "news API {}: {}",
            resp.code.as_deref().unwrap_or("error"),
            resp.message.as_deref().unwrap_or("no message")
        )));
    }

    Ok(resp
        .articles
        .into_iter()
        .map(|a| Headline { title: a.title })
        .collect())
}
