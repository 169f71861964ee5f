use std::time::Duration;

use reqwest::Client;
use reqwest::Method;
use reqwest::RequestBuilder;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Serialize;

/// Thin client for the MailChimp marketing API. It shapes requests
/// (addressing, auth, timeout) and decodes responses; which paths exist and
/// what the field maps mean is the caller's business. No retries happen here.
pub struct MailchimpClient {
    http_client: Client,
    base_url: String,
    api_key: Secret<String>,
}

// establishing a HTTP connection is expensive; the one `Client` is kept at
// the top level (App) and cloned into handlers, reusing its connection pool

impl MailchimpClient {
    pub fn new(
        base_url: String,
        api_key: Secret<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
            api_key,
        })
    }

    /// `POST {base_url}/{path}`. Returns the decoded JSON body; any non-2xx
    /// status is an error.
    pub async fn post(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<serde_json::Value, reqwest::Error> {
        self.request(Method::POST, path)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// `PATCH {base_url}/{path}`. Returns the decoded JSON body.
    pub async fn patch(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<serde_json::Value, reqwest::Error> {
        self.request(Method::PATCH, path)
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// `DELETE {base_url}/{path}`. The response body is discarded.
    pub async fn delete(
        &self,
        path: &str,
    ) -> Result<(), reqwest::Error> {
        self.request(Method::DELETE, path).send().await?.error_for_status()?;
        Ok(())
    }

    fn request(
        &self,
        method: Method,
        path: &str,
    ) -> RequestBuilder {
        // MailChimp's Basic auth ignores the username; only the key matters
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        self.http_client
            .request(method, url)
            .basic_auth("anystring", Some(self.api_key.expose_secret()))
    }
}
