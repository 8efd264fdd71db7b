//! Bulk address-correction service client.
//!
//! The service accepts a sender plus up to four recipients per request and
//! returns a correction artifact reference per batch. Batch assembly lives
//! in the engine; this client only posts one batch and hands back the
//! artifact. Wire keys are snake-case Portuguese.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::carrier::DeclaredItem;
use crate::config::AddresserConfig;

/// Timeout for bulk correction calls.
const BULK_TIMEOUT: Duration = Duration::from_secs(300);

/// Maximum recipients the service accepts per request.
pub const MAX_RECIPIENTS_PER_BATCH: usize = 4;

/// Errors that can occur when interacting with the correction service.
#[derive(Debug, Error)]
pub enum AddresserError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Sender block of a correction batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionSender {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "cpf_cnpj")]
    pub tax_id: String,
    #[serde(rename = "logradouro")]
    pub street: String,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "complemento")]
    pub complement: String,
    #[serde(rename = "bairro")]
    pub neighborhood: String,
    #[serde(rename = "cidade")]
    pub city: String,
    #[serde(rename = "estado")]
    pub state: String,
    pub cep: String,
}

/// One recipient of a correction batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionRecipient {
    /// Order number, used by the service to label the artifact.
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "cpf_cnpj")]
    pub tax_id: String,
    #[serde(rename = "logradouro")]
    pub street: String,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "complemento")]
    pub complement: String,
    #[serde(rename = "bairro")]
    pub neighborhood: String,
    #[serde(rename = "cidade")]
    pub city: String,
    #[serde(rename = "estado")]
    pub state: String,
    /// Hyphenated `XXXXX-XXX` postal code.
    pub cep: String,
    #[serde(rename = "itens_declaracao_conteudo")]
    pub declared_items: Vec<DeclaredItem>,
    /// Total weight in kilograms, comma decimal separator ("2,5").
    #[serde(rename = "peso_total")]
    pub total_weight: String,
}

/// One batch: the sender plus at most four recipients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionBatch {
    #[serde(rename = "remetente")]
    pub sender: CorrectionSender,
    #[serde(rename = "destinatario")]
    pub recipients: Vec<CorrectionRecipient>,
}

/// Opaque artifact reference returned per submitted batch.
pub type CorrectionArtifact = serde_json::Value;

/// Bulk address-correction service client.
#[derive(Clone)]
pub struct AddresserClient {
    client: reqwest::Client,
    base_url: String,
}

impl AddresserClient {
    /// Create a new correction-service client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &AddresserConfig) -> Result<Self, AddresserError> {
        let client = reqwest::Client::builder().timeout(BULK_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Submit one correction batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, batch), fields(recipients = batch.recipients.len()))]
    pub async fn submit_batch(
        &self,
        batch: &CorrectionBatch,
    ) -> Result<CorrectionArtifact, AddresserError> {
        let url = format!("{}/correios/enderecador/encomendas", self.base_url);

        let response = self.client.post(&url).json(batch).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AddresserError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}
