use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use super::types::ListResponse;
use super::{ListQuery, NotificationApi, TransportError};
use crate::models::NotificationPage;

/// REST client for the notification collection
pub struct HttpNotificationApi {
    base_url: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl HttpNotificationApi {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token,
            client: reqwest::Client::new(),
        }
    }

    /// `{base}/notifications/{segments...}` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push("notifications")
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status { status, body })
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn list(&self, query: ListQuery) -> Result<NotificationPage, TransportError> {
        let url = self.endpoint(&[])?;
        let mut params = vec![
            ("unreadOnly", query.unread_only.to_string()),
            ("limit", query.limit.to_string()),
            ("skip", query.skip.to_string()),
        ];
        if let Some(scope) = query.scope {
            params.push(("organizationId", scope));
        }

        debug!(%url, ?params, "listing notifications");
        let response = self
            .authorized(self.client.get(url).query(&params))
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(body.into())
    }

    async fn mark_one_read(&self, id: &str) -> Result<(), TransportError> {
        let url = self.endpoint(&[id, "read"])?;
        let response = self.authorized(self.client.patch(url)).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn mark_all_read(&self, scope: Option<&str>) -> Result<(), TransportError> {
        let url = self.endpoint(&["read-all"])?;
        let body = serde_json::json!({ "organizationId": scope });
        let response = self
            .authorized(self.client.patch(url).json(&body))
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_paths() {
        let api = HttpNotificationApi::new("https://docs.example.com/api/", None);
        assert_eq!(
            api.endpoint(&[]).unwrap().as_str(),
            "https://docs.example.com/api/notifications"
        );
        assert_eq!(
            api.endpoint(&["n 1/x", "read"]).unwrap().as_str(),
            "https://docs.example.com/api/notifications/n%201%2Fx/read"
        );
    }

    #[test]
    fn test_endpoint_without_trailing_slash() {
        let api = HttpNotificationApi::new("http://localhost:3000/api", None);
        assert_eq!(
            api.endpoint(&["read-all"]).unwrap().as_str(),
            "http://localhost:3000/api/notifications/read-all"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let api = HttpNotificationApi::new("not a url", None);
        assert!(matches!(
            api.endpoint(&[]),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    #[ignore] // Requires a running document service
    async fn test_list_against_local_server() {
        let api = HttpNotificationApi::new("http://localhost:3000/api", None);
        let page = api
            .list(ListQuery {
                scope: None,
                unread_only: false,
                limit: 20,
                skip: 0,
            })
            .await
            .unwrap();
        assert!(page.items.len() <= 20);
    }
}
