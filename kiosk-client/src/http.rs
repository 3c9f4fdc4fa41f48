//! HTTP client for the order and robot-position REST APIs

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use shared::models::{Order, OrderListResponse, OrderStatus, OrderStatusUpdate};
use shared::position::PositionSample;

use crate::api::{OrderApi, OrderQuery, PositionApi};
use crate::{ClientConfig, ClientError, ClientResult};

/// HTTP client for network requests to the order service
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header(header::AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    /// Map non-2xx statuses onto client errors
    async fn check_status(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::FORBIDDEN => ClientError::Forbidden(text),
            StatusCode::NOT_FOUND => ClientError::NotFound(text),
            StatusCode::BAD_REQUEST => ClientError::Validation(text),
            _ => ClientError::Internal(text),
        })
    }
}

#[async_trait]
impl OrderApi for HttpClient {
    /// `GET /orders?startDate&endDate&sortBy&sortDirection`
    async fn fetch_orders(&self, query: &OrderQuery) -> ClientResult<Vec<Order>> {
        let request = self
            .authorize(self.client.get(self.url("/orders")))
            .query(&[
                ("startDate", query.start_date.as_str()),
                ("endDate", query.end_date.as_str()),
                ("sortBy", query.sort_by.as_str()),
                ("sortDirection", query.sort_direction.as_str()),
            ]);

        let response = Self::check_status(request.send().await?).await?;
        let list: OrderListResponse = response.json().await?;
        Ok(list.into_orders())
    }

    /// `PATCH /orders/{id}/status`
    async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> ClientResult<()> {
        let body = OrderStatusUpdate {
            order_status: status,
        };
        let request = self
            .authorize(self.client.patch(self.url(&format!("/orders/{order_id}/status"))))
            .json(&body);

        Self::check_status(request.send().await?).await?;
        Ok(())
    }

    /// `DELETE /orders/{id}`
    async fn delete_order(&self, order_id: &str) -> ClientResult<()> {
        let request = self.authorize(self.client.delete(self.url(&format!("/orders/{order_id}"))));
        Self::check_status(request.send().await?).await?;
        Ok(())
    }

    /// `PUT /orders/{id}`
    async fn update_order(&self, order_id: &str, order: &Order) -> ClientResult<()> {
        let request = self
            .authorize(self.client.put(self.url(&format!("/orders/{order_id}"))))
            .json(order);
        Self::check_status(request.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl PositionApi for HttpClient {
    /// `GET /robot-positions/current` — plain-text position key
    async fn current_position(&self) -> ClientResult<PositionSample> {
        let request = self
            .authorize(self.client.get(self.url("/robot-positions/current")))
            .header(header::ACCEPT, "text/plain");

        let response = Self::check_status(request.send().await?).await?;
        let body = response.text().await?;
        Ok(PositionSample::from_raw(&body))
    }

    /// `PUT /robot-positions/current?position=`
    async fn update_position(&self, position: &str) -> ClientResult<()> {
        let request = self
            .authorize(self.client.put(self.url("/robot-positions/current")))
            .query(&[("position", position)]);
        Self::check_status(request.send().await?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = ClientConfig::new("http://localhost:8080/").build_http_client();
        assert_eq!(client.url("/orders"), "http://localhost:8080/orders");
        assert_eq!(client.url("orders"), "http://localhost:8080/orders");
    }
}
