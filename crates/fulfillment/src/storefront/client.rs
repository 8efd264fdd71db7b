//! Storefront HTTP client.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::instrument;

use crate::config::StorefrontConfig;

use super::StorefrontError;
use super::types::{FulfillmentRequest, Order, OrderPage, OrderQueryFilter, OrderQuerySort};

/// Timeout for storefront calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Rows per query page (storefront maximum).
const PAGE_LIMIT: u64 = 100;

/// Storefront API client.
#[derive(Clone)]
pub struct StorefrontClient {
    client: reqwest::Client,
    base_url: String,
}

/// Order query response body.
#[derive(Debug, Deserialize)]
struct OrderQueryResponse {
    #[serde(default)]
    orders: Vec<Order>,
    #[serde(rename = "totalResults", default)]
    total_results: u64,
}

impl StorefrontClient {
    /// Create a new storefront client with the static auth headers installed.
    ///
    /// # Errors
    ///
    /// Returns an error if a header value is malformed or the HTTP client
    /// fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, StorefrontError> {
        let mut headers = HeaderMap::new();

        let mut auth = HeaderValue::from_str(config.api_token.expose_secret())
            .map_err(|_| StorefrontError::InvalidHeader("Authorization"))?;
        auth.set_sensitive(true);
        headers.insert("Authorization", auth);

        headers.insert(
            "X-Account-Id",
            HeaderValue::from_str(&config.account_id)
                .map_err(|_| StorefrontError::InvalidHeader("X-Account-Id"))?,
        );
        headers.insert(
            "X-Site-Id",
            HeaderValue::from_str(&config.site_id)
                .map_err(|_| StorefrontError::InvalidHeader("X-Site-Id"))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(DEFAULT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Query one page of orders at the given row offset.
    ///
    /// The filter document and sort array are JSON-encoded *strings* inside
    /// the body - that is the storefront's query grammar, not an accident.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, filter), fields(offset = offset))]
    pub async fn query_orders(
        &self,
        filter: &OrderQueryFilter,
        sort: OrderQuerySort,
        offset: u64,
    ) -> Result<OrderPage, StorefrontError> {
        let url = format!("{}/stores/v2/orders/query", self.base_url);

        let body = serde_json::json!({
            "query": {
                "filter": filter.to_filter_json().to_string(),
                "paging": { "limit": PAGE_LIMIT, "offset": offset },
                "sort": serde_json::Value::Array(vec![sort.to_sort_json()]).to_string(),
            }
        });

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let page: OrderQueryResponse = response.json().await?;
        Ok(OrderPage::new(page.orders, page.total_results))
    }

    /// Query all matching orders, iterating offset pages of 100 until the
    /// reported total is covered.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    #[instrument(skip(self, filter))]
    pub async fn query_orders_all(
        &self,
        filter: &OrderQueryFilter,
        sort: OrderQuerySort,
    ) -> Result<OrderPage, StorefrontError> {
        let mut orders = Vec::new();
        let mut total_results = 0;
        let mut offset = 0;

        loop {
            let page = self.query_orders(filter, sort, offset).await?;
            total_results = page.total_results;
            if page.orders.is_empty() {
                break;
            }
            offset += page.orders.len() as u64;
            orders.extend(page.orders);
            if offset >= total_results {
                break;
            }
        }

        Ok(OrderPage::new(orders, total_results))
    }

    /// Create a fulfillment on an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, fulfillment), fields(order_id = %order_id))]
    pub async fn create_fulfillment(
        &self,
        order_id: &str,
        fulfillment: &FulfillmentRequest,
    ) -> Result<(), StorefrontError> {
        let url = format!("{}/stores/v2/orders/{order_id}/fulfillments", self.base_url);
        let body = serde_json::json!({ "fulfillment": fulfillment });

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(())
    }

    /// Delete a fulfillment from an order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(order_id = %order_id, fulfillment_id = %fulfillment_id))]
    pub async fn delete_fulfillment(
        &self,
        order_id: &str,
        fulfillment_id: &str,
    ) -> Result<(), StorefrontError> {
        let url = format!(
            "{}/stores/v2/orders/{order_id}/fulfillments/{fulfillment_id}",
            self.base_url
        );

        let response = self.client.delete(&url).send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(())
    }
}

/// Turn an error response into [`StorefrontError::Api`], consuming the body.
async fn api_error(response: reqwest::Response) -> StorefrontError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    StorefrontError::Api { status, message }
}
