//! Carrier API wire types.
//!
//! Field names follow the carrier's JSON contract (Portuguese), mapped to
//! idiomatic names via serde renames. Monetary values travel as JSON
//! numbers; the declared weight travels as a **string** of integer grams -
//! that is what the carrier expects, unusual as it looks.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CarrierError;

/// Bearer token issued by the carrier token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BearerToken {
    /// The bearer token for API calls.
    pub token: String,
    /// Expiry timestamp as reported by the carrier.
    #[serde(rename = "expiraEm", default)]
    pub expires_at: Option<String>,
    /// Environment the token was issued for.
    #[serde(rename = "ambiente", default)]
    pub environment: Option<String>,
}

/// Lifecycle status of a pre-postagem.
///
/// `PreAttended -> PrePosted -> Posted`, with terminal alternate states
/// `Expired`, `Canceled`, and `Reversed`. Transitions are driven entirely by
/// the carrier; this system only reads the status and issues cancel
/// requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentStatus {
    #[serde(rename = "PREATENDIDO")]
    PreAttended,
    #[serde(rename = "PREPOSTADO")]
    PrePosted,
    #[serde(rename = "POSTADO")]
    Posted,
    #[serde(rename = "EXPIRADO")]
    Expired,
    #[serde(rename = "CANCELADO")]
    Canceled,
    #[serde(rename = "ESTORNADO")]
    Reversed,
}

impl ShipmentStatus {
    /// Wire value used in query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreAttended => "PREATENDIDO",
            Self::PrePosted => "PREPOSTADO",
            Self::Posted => "POSTADO",
            Self::Expired => "EXPIRADO",
            Self::Canceled => "CANCELADO",
            Self::Reversed => "ESTORNADO",
        }
    }
}

/// Payment modality of a pre-postagem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMode {
    #[serde(rename = "A_VISTA")]
    Upfront,
    #[serde(rename = "A_FATURAR")]
    Invoiced,
    #[serde(rename = "A_VISTA_FATURAR")]
    UpfrontInvoiced,
    #[serde(rename = "PRESTACAO_CONTAS_REC_PAG")]
    Settlement,
}

impl PaymentMode {
    /// Wire value used in query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upfront => "A_VISTA",
            Self::Invoiced => "A_FATURAR",
            Self::UpfrontInvoiced => "A_VISTA_FATURAR",
            Self::Settlement => "PRESTACAO_CONTAS_REC_PAG",
        }
    }
}

/// Object type filter for pre-postagem queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectType {
    #[serde(rename = "TODOS")]
    All,
    #[serde(rename = "SIMPLES")]
    Simple,
    #[serde(rename = "REGISTRADO")]
    Registered,
}

impl ObjectType {
    /// Wire value used in query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "TODOS",
            Self::Simple => "SIMPLES",
            Self::Registered => "REGISTRADO",
        }
    }
}

/// Filter for pre-postagem queries.
///
/// Predicates are combined with logical AND; unset predicates are omitted
/// from the query string rather than defaulted.
#[derive(Debug, Clone, Default)]
pub struct ShipmentQuery {
    /// Tracking identifier of a single shipment.
    pub object_code: Option<String>,
    /// Payment modality.
    pub payment_mode: Option<PaymentMode>,
    /// Object type.
    pub object_type: Option<ObjectType>,
    /// Lifecycle status.
    pub status: Option<ShipmentStatus>,
}

impl ShipmentQuery {
    /// Query-string pairs for the set predicates, in wire order.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(code) = &self.object_code {
            pairs.push(("codigoObjeto", code.clone()));
        }
        if let Some(mode) = self.payment_mode {
            pairs.push(("modalidadePagamento", mode.as_str().to_string()));
        }
        if let Some(kind) = self.object_type {
            pairs.push(("tipoObjeto", kind.as_str().to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        pairs
    }
}

/// Address block shared by sender and recipient parties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyAddress {
    /// Eight-digit postal code.
    pub cep: String,
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
    #[serde(rename = "uf")]
    pub state: String,
}

/// Shipment sender (remetente).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderParty {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "cpfCnpj")]
    pub tax_id: String,
    #[serde(rename = "email", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "endereco")]
    pub address: PartyAddress,
}

/// Shipment recipient (destinatario).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientParty {
    #[serde(rename = "nome")]
    pub name: String,
    /// Landline area code - unused by this integration, always empty.
    #[serde(rename = "dddTelefone")]
    pub landline_area_code: String,
    #[serde(rename = "telefone")]
    pub landline: String,
    #[serde(rename = "dddCelular")]
    pub mobile_area_code: String,
    #[serde(rename = "celular")]
    pub mobile: String,
    pub email: String,
    #[serde(rename = "cpfCnpj")]
    pub tax_id: String,
    #[serde(rename = "documentoEstrangeiro")]
    pub foreign_document: String,
    /// Free-text note; carries the `number:<order>` correlation tag.
    #[serde(rename = "obs")]
    pub note: String,
    #[serde(rename = "endereco")]
    pub address: PartyAddress,
}

/// Additional service attached to a shipment (declared-value insurance).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalService {
    #[serde(rename = "codigoServicoAdicional")]
    pub code: String,
    #[serde(
        rename = "valorDeclarado",
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub declared_value: Option<Decimal>,
}

/// One line of the customs/insurance content declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclaredItem {
    #[serde(rename = "conteudo")]
    pub description: String,
    #[serde(rename = "quantidade")]
    pub quantity: u32,
    /// Line total, not the unit price.
    #[serde(rename = "valor", with = "rust_decimal::serde::float")]
    pub value: Decimal,
}

/// Request payload for creating a pre-postagem.
///
/// Ephemeral - built fresh per order, submitted, never persisted directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentRequest {
    #[serde(rename = "remetente")]
    pub sender: SenderParty,
    #[serde(rename = "destinatario")]
    pub recipient: RecipientParty,
    #[serde(rename = "codigoServico")]
    pub service_code: String,
    #[serde(rename = "listaServicoAdicional")]
    pub additional_services: Vec<AdditionalService>,
    #[serde(rename = "itensDeclaracaoConteudo")]
    pub declared_items: Vec<DeclaredItem>,
    /// Declared weight in integer grams, as a string per the carrier contract.
    #[serde(rename = "pesoInformado")]
    pub weight_grams: String,
    #[serde(rename = "observacao")]
    pub observation: String,
}

/// A pre-postagem as the carrier reports it.
///
/// Only the fields this system reads are typed; everything else rides along
/// in `extra` so replica documents keep full fidelity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentRecord {
    /// Carrier-internal record id.
    #[serde(default)]
    pub id: Option<String>,
    /// Tracking identifier.
    #[serde(rename = "codigoObjeto", default)]
    pub object_code: Option<String>,
    /// Lifecycle status.
    #[serde(rename = "statusAtual", default)]
    pub status: Option<ShipmentStatus>,
    /// Contracted service code.
    #[serde(rename = "codigoServico", default)]
    pub service_code: Option<String>,
    /// Remaining carrier fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ShipmentRecord {
    /// Identifier under which the record is replicated: the carrier record
    /// id, falling back to the tracking code.
    #[must_use]
    pub fn replica_id(&self) -> Option<&str> {
        self.id.as_deref().or(self.object_code.as_deref())
    }
}

/// Canonical address for a postal code, per the carrier's lookup endpoint.
///
/// Read-only reference data; fields the carrier omits default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    #[serde(default)]
    pub cep: String,
    #[serde(rename = "logradouro", default)]
    pub street: String,
    #[serde(rename = "bairro", default)]
    pub neighborhood: String,
    #[serde(rename = "localidade", default)]
    pub city: String,
    #[serde(rename = "uf", default)]
    pub state: String,
    /// First street number the postal code covers, when ranged.
    #[serde(rename = "numeroInicial", default)]
    pub number_start: Option<String>,
    /// Last street number the postal code covers, when ranged.
    #[serde(rename = "numeroFinal", default)]
    pub number_end: Option<String>,
}

/// Receipt for an asynchronous label-generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelReceipt {
    #[serde(rename = "idRecibo")]
    pub receipt_id: String,
}

/// A generated label PDF, base64-encoded as delivered by the carrier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelPdf {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "dados")]
    pub data: String,
}

impl LabelPdf {
    /// Decode the base64 payload into raw PDF bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CarrierError::Decode`] when the payload is not valid base64.
    pub fn decode_bytes(&self) -> Result<Vec<u8>, CarrierError> {
        BASE64
            .decode(&self.data)
            .map_err(|e| CarrierError::Decode(e.to_string()))
    }
}

/// A service listed on the carrier contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractService {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "descricao")]
    pub description: String,
}
