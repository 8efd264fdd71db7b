//! Carrier HTTP client.

use std::sync::Arc;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::instrument;

use despacho_core::digits_only;

use crate::config::CarrierConfig;

use super::CarrierError;
use super::types::{
    BearerToken, ContractService, LabelPdf, LabelReceipt, ResolvedAddress, ShipmentQuery,
    ShipmentRecord, ShipmentRequest,
};

/// Timeout for ordinary calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for bulk label generation/download.
const BULK_TIMEOUT: Duration = Duration::from_secs(300);

/// Token fetch attempts before giving up.
const TOKEN_FETCH_ATTEMPTS: u32 = 3;

/// Fixed delay between token fetch attempts.
const TOKEN_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Page size on pre-postagem queries (carrier maximum).
const QUERY_PAGE_SIZE: &str = "100";

/// Page size on contract-service listings.
const CONTRACT_PAGE_SIZE: &str = "200";

/// Carrier API client.
///
/// Cheap to clone; the HTTP client and the cached bearer token are shared.
#[derive(Clone)]
pub struct CarrierClient {
    inner: Arc<CarrierClientInner>,
}

struct CarrierClientInner {
    client: reqwest::Client,
    base_url: String,
    user: String,
    access_code: String,
    cnpj: String,
    contract: String,
    posting_card: Option<String>,
    /// In-memory token cache, written only by `authenticate`.
    token: RwLock<Option<BearerToken>>,
}

/// Paged listing wrapper used by several carrier endpoints.
#[derive(Debug, Deserialize)]
struct PagedItems<T> {
    #[serde(rename = "itens", default = "Vec::new")]
    items: Vec<T>,
}

/// Label download payload; `data` is absent while generation is in flight.
#[derive(Debug, Deserialize)]
struct LabelDownloadResponse {
    #[serde(rename = "nome", default)]
    name: Option<String>,
    #[serde(rename = "dados", default)]
    data: Option<String>,
}

impl CarrierClient {
    /// Create a new carrier client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &CarrierConfig) -> Result<Self, CarrierError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(CarrierClientInner {
                client,
                base_url: config.base_url.clone(),
                user: config.user.clone(),
                access_code: config.access_code.expose_secret().to_string(),
                cnpj: config.cnpj.clone(),
                contract: config.contract.clone(),
                posting_card: config.posting_card.clone(),
                token: RwLock::new(None),
            }),
        })
    }

    /// Whether a posting card is configured.
    #[must_use]
    pub fn has_posting_card(&self) -> bool {
        self.inner.posting_card.is_some()
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Fetch and cache a bearer token.
    ///
    /// Uses the posting-card token variant when a card number is configured,
    /// the plain variant otherwise. Retries up to three times with a fixed
    /// delay. The token is not refreshed automatically afterwards; a 401 on
    /// a later call surfaces as [`CarrierError::Api`].
    ///
    /// # Errors
    ///
    /// Returns [`CarrierError::Auth`] when every attempt fails.
    #[instrument(skip(self))]
    pub async fn authenticate(&self) -> Result<(), CarrierError> {
        let mut last_error = String::new();

        for attempt in 1..=TOKEN_FETCH_ATTEMPTS {
            match self.fetch_token().await {
                Ok(token) => {
                    *self.inner.token.write().await = Some(token);
                    return Ok(());
                }
                Err(error) => {
                    tracing::warn!(attempt, %error, "carrier token fetch failed");
                    last_error = error.to_string();
                }
            }

            if attempt < TOKEN_FETCH_ATTEMPTS {
                tokio::time::sleep(TOKEN_RETRY_DELAY).await;
            }
        }

        Err(CarrierError::Auth {
            attempts: TOKEN_FETCH_ATTEMPTS,
            message: last_error,
        })
    }

    async fn fetch_token(&self) -> Result<BearerToken, CarrierError> {
        let basic = BASE64.encode(format!(
            "{}:{}",
            self.inner.user, self.inner.access_code
        ));

        let request = if let Some(card) = &self.inner.posting_card {
            let url = format!("{}/token/v1/autentica/cartaopostagem", self.inner.base_url);
            self.inner
                .client
                .post(&url)
                .json(&serde_json::json!({ "numero": card }))
        } else {
            let url = format!("{}/token/v1/autentica", self.inner.base_url);
            self.inner.client.post(&url)
        };

        let response = request
            .header("Authorization", format!("Basic {basic}"))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// The cached bearer token, or [`CarrierError::NoToken`].
    async fn bearer_token(&self) -> Result<String, CarrierError> {
        self.inner
            .token
            .read()
            .await
            .as_ref()
            .map(|t| t.token.clone())
            .ok_or(CarrierError::NoToken)
    }

    // =========================================================================
    // Address lookup
    // =========================================================================

    /// Resolve the canonical address for a postal code.
    ///
    /// The input is normalized by stripping non-digit characters. Returns
    /// `Ok(None)` when the carrier does not know the code, so callers can
    /// distinguish "not found" from transport failures. Single attempt, no
    /// retry, no caching across calls.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or non-404 error responses.
    #[instrument(skip(self), fields(postal_code = %postal_code))]
    pub async fn resolve_address(
        &self,
        postal_code: &str,
    ) -> Result<Option<ResolvedAddress>, CarrierError> {
        let token = self.bearer_token().await?;
        let digits = digits_only(postal_code);
        let url = format!("{}/cep/v2/enderecos/{digits}", self.inner.base_url);

        let response = self.inner.client.get(&url).bearer_auth(&token).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(Some(response.json().await?))
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            Err(api_error(response).await)
        }
    }

    // =========================================================================
    // Pre-postagem lifecycle
    // =========================================================================

    /// Create a pre-postagem.
    ///
    /// # Errors
    ///
    /// Any non-success response is an error; there is no partial success.
    #[instrument(skip(self, request), fields(observation = %request.observation))]
    pub async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<ShipmentRecord, CarrierError> {
        let token = self.bearer_token().await?;
        let url = format!("{}/prepostagem/v1/prepostagens", self.inner.base_url);

        let response = self
            .inner
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Cancel a pre-postagem by tracking code.
    ///
    /// Best-effort: the caller is expected to have confirmed a tracking
    /// number exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the carrier rejects it.
    #[instrument(skip(self), fields(object_code = %object_code))]
    pub async fn cancel_shipment(&self, object_code: &str) -> Result<(), CarrierError> {
        let token = self.bearer_token().await?;
        let url = format!(
            "{}/prepostagem/v1/prepostagens/objeto/{object_code}",
            self.inner.base_url
        );

        let response = self
            .inner
            .client
            .delete(&url)
            .query(&[("idCorreiosSolicitanteCancelamento", &self.inner.user)])
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(())
    }

    /// Query pre-postagens with optional AND-combined predicates.
    ///
    /// Unset predicates are omitted from the query string. Results are
    /// capped at one page of 100 by the carrier.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, query))]
    pub async fn query_shipments(
        &self,
        query: &ShipmentQuery,
    ) -> Result<Vec<ShipmentRecord>, CarrierError> {
        let token = self.bearer_token().await?;
        let url = format!("{}/prepostagem/v2/prepostagens", self.inner.base_url);

        let response = self
            .inner
            .client
            .get(&url)
            .query(&query.to_query_pairs())
            .query(&[("page", "0"), ("size", QUERY_PAGE_SIZE)])
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let page: PagedItems<ShipmentRecord> = response.json().await?;
        Ok(page.items)
    }

    /// Fetch the HTML content declaration for a pre-postagem id.
    ///
    /// Returns `Ok(None)` when the carrier has no declaration for the id.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or non-404 error responses.
    #[instrument(skip(self), fields(shipment_id = %shipment_id))]
    pub async fn content_declaration(
        &self,
        shipment_id: &str,
    ) -> Result<Option<String>, CarrierError> {
        let token = self.bearer_token().await?;
        let url = format!(
            "{}/prepostagem/v1/prepostagens/declaracaoconteudo/{shipment_id}",
            self.inner.base_url
        );

        let response = self
            .inner
            .client
            .get(&url)
            .header("Accept", "application/json, text/html, text/plain")
            .bearer_auth(&token)
            .send()
            .await?;
        let status = response.status();

        if status.is_success() {
            Ok(Some(response.text().await?))
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            Err(api_error(response).await)
        }
    }

    // =========================================================================
    // Labels
    // =========================================================================

    /// Submit a batch of tracking codes for asynchronous PDF label
    /// generation. Returns the receipt used to poll for the download.
    ///
    /// # Errors
    ///
    /// Returns [`CarrierError::MissingPostingCard`] without a configured
    /// card, or an error if the request fails.
    #[instrument(skip(self, object_codes), fields(count = object_codes.len()))]
    pub async fn request_labels(
        &self,
        object_codes: &[String],
    ) -> Result<LabelReceipt, CarrierError> {
        let token = self.bearer_token().await?;
        let card = self
            .inner
            .posting_card
            .as_ref()
            .ok_or(CarrierError::MissingPostingCard)?;
        let url = format!(
            "{}/prepostagem/v1/prepostagens/rotulo/assincrono/pdf",
            self.inner.base_url
        );

        let body = serde_json::json!({
            "codigosObjeto": object_codes,
            "numeroCartaoPostagem": card,
            "tipoRotulo": "P",
            "formatoRotulo": "ET",
            "imprimeRemetente": "S",
        });

        let response = self
            .inner
            .client
            .post(&url)
            .timeout(BULK_TIMEOUT)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Poll the asynchronous label download for a receipt.
    ///
    /// Returns `Ok(None)` while generation is still in flight (no payload
    /// yet, or the receipt is not known yet). The caller owns retry pacing.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or error responses.
    #[instrument(skip(self), fields(receipt_id = %receipt_id))]
    pub async fn download_labels(
        &self,
        receipt_id: &str,
    ) -> Result<Option<LabelPdf>, CarrierError> {
        let token = self.bearer_token().await?;
        let url = format!(
            "{}/prepostagem/v1/prepostagens/rotulo/download/assincrono/{receipt_id}",
            self.inner.base_url
        );

        let response = self
            .inner
            .client
            .get(&url)
            .timeout(BULK_TIMEOUT)
            .bearer_auth(&token)
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(api_error(response).await);
        }

        let payload: LabelDownloadResponse = response.json().await?;
        match (payload.name, payload.data) {
            (Some(name), Some(data)) => Ok(Some(LabelPdf { name, data })),
            _ => Ok(None),
        }
    }

    // =========================================================================
    // Contract
    // =========================================================================

    /// Look up a contracted service by case-insensitive description.
    ///
    /// # Errors
    ///
    /// Returns [`CarrierError::MissingPostingCard`] without a configured
    /// card, or an error if the request fails.
    #[instrument(skip(self), fields(description = %description))]
    pub async fn contract_service(
        &self,
        description: &str,
    ) -> Result<Option<ContractService>, CarrierError> {
        let token = self.bearer_token().await?;
        let card = self
            .inner
            .posting_card
            .as_ref()
            .ok_or(CarrierError::MissingPostingCard)?;
        let url = format!(
            "{}/meucontrato/v1/empresas/{}/contratos/{}/cartoes/{card}/servicos",
            self.inner.base_url, self.inner.cnpj, self.inner.contract
        );

        let response = self
            .inner
            .client
            .get(&url)
            .query(&[("page", "0"), ("size", CONTRACT_PAGE_SIZE)])
            .bearer_auth(&token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let page: PagedItems<ContractService> = response.json().await?;
        Ok(page
            .items
            .into_iter()
            .find(|s| s.description.eq_ignore_ascii_case(description)))
    }
}

/// Turn an error response into [`CarrierError::Api`], consuming the body.
async fn api_error(response: reqwest::Response) -> CarrierError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    CarrierError::Api { status, message }
}
