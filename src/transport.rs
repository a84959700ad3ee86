//! HTTP session against the portal. Cookies persist across calls and every
//! request carries browser headers, otherwise the portal's anti-bot filter
//! serves an interstitial page.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, REFERER};
use tracing::trace;

use crate::protocol::{
    BROWSER_ACCEPT, COMMAND_PATH, CONTROL_PATH, Form, LOGIN_PATH, TELEMETRY_PATH,
};
use crate::Result;

pub(crate) struct Transport {
    http: reqwest::Client,
    base_url: String,
}

impl Transport {
    pub fn new(base_url: &str, user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        if let Ok(referer) = HeaderValue::from_str(&format!("{base_url}{LOGIN_PATH}")) {
            headers.insert(REFERER, referer);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .cookie_provider(Arc::new(Jar::default()));
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Primes the session cookies. The response body carries nothing useful.
    pub async fn login(&self, form: &Form) -> reqwest::Result<()> {
        let resp = self.http.post(self.url(LOGIN_PATH)).form(form).send().await?;
        trace!(status = resp.status().as_u16(), "login response");
        Ok(())
    }

    pub async fn control_page(&self, query: &Form) -> reqwest::Result<String> {
        let resp = self.http.get(self.url(CONTROL_PATH)).query(query).send().await?;
        trace!(status = resp.status().as_u16(), "control page response");
        resp.text().await
    }

    /// Returns the status code and raw body; decoding is the caller's call.
    pub async fn telemetry(&self, query: &Form) -> reqwest::Result<(u16, String)> {
        let resp = self.http.get(self.url(TELEMETRY_PATH)).query(query).send().await?;
        let status = resp.status().as_u16();
        Ok((status, resp.text().await?))
    }

    pub async fn command(&self, form: &Form) -> reqwest::Result<u16> {
        let resp = self.http.post(self.url(COMMAND_PATH)).form(form).send().await?;
        Ok(resp.status().as_u16())
    }
}
