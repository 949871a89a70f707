//! Certificate issuance, lookup, and PDF download.
//!
//! The issue endpoint is redirect-exempt: a 401 there still clears the
//! credential but surfaces to the caller instead of forcing navigation, so an
//! inspector mid-form can re-authenticate without losing their input. The
//! exemption lives in the client's pipeline configuration; this module only
//! defines the endpoint.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::{ApiClient, ApiError, BinaryPayload};

/// Path of the issue endpoint, exempt from the global 401 redirect.
pub const ISSUE_PATH: &str = "/api/certificates/issue";

/// Payload for `POST /api/certificates/issue`.
///
/// Dates travel as `YYYY-MM-DD` strings, matching the backend's wire format.
/// Optional fields are omitted and filled in server-side (certificate number,
/// issue date now, expiry one year out).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequest {
    /// Certificate number; generated by the server when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_number: Option<String>,
    /// Issue date; defaults to today server-side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,
    /// Expiry date; defaults to issue date plus one year server-side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_date: Option<String>,
    /// Inspection date.
    pub inspect_date: String,
    /// Vehicle manufacturer.
    pub manufacturer: String,
    /// Vehicle model name.
    pub model_name: String,
    /// Vehicle identification number.
    pub vin: String,
    /// Manufacture year.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacture_year: Option<u16>,
    /// First registration date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_register_date: Option<String>,
    /// Odometer reading in kilometers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage: Option<u32>,
    /// Inspector code.
    pub inspector_code: String,
    /// Inspector name.
    pub inspector_name: String,
    /// Path to the inspector's signature image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_path: Option<String>,
    /// Issuing party.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_by: Option<String>,
}

/// A certificate as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// Server-assigned id.
    pub id: i64,
    /// Certificate number.
    pub cert_number: String,
    /// Issue date.
    pub issue_date: String,
    /// Expiry date.
    pub expire_date: String,
    /// Inspection date.
    pub inspect_date: String,
    /// Vehicle manufacturer.
    pub manufacturer: String,
    /// Vehicle model name.
    pub model_name: String,
    /// Vehicle identification number.
    pub vin: String,
    /// Manufacture year.
    #[serde(default)]
    pub manufacture_year: Option<u16>,
    /// First registration date.
    #[serde(default)]
    pub first_register_date: Option<String>,
    /// Odometer reading in kilometers.
    #[serde(default)]
    pub mileage: Option<u32>,
    /// Inspector code.
    pub inspector_code: String,
    /// Inspector name.
    pub inspector_name: String,
    /// Issuing party.
    pub issued_by: String,
    /// Location of the generated PDF.
    pub pdf_file_path: String,
}

/// Certificate operations over a borrowed client.
#[derive(Debug, Clone, Copy)]
pub struct CertificateService<'a> {
    client: &'a ApiClient,
}

impl<'a> CertificateService<'a> {
    /// Creates a service over the given client.
    #[must_use]
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Issues a certificate.
    ///
    /// A 401 here surfaces as [`ApiError::Unauthorized`] without the login
    /// redirect, so the caller can prompt inline.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on rejection or transport failure.
    pub async fn issue(&self, request: &CertificateRequest) -> Result<Certificate, ApiError> {
        self.client.post(ISSUE_PATH, request).await
    }

    /// Looks up the certificate for a vehicle identification number.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when no certificate exists for the VIN.
    pub async fn find_by_vin(&self, vin: &str) -> Result<Certificate, ApiError> {
        self.client.get(&format!("/api/certificates/vin/{vin}")).await
    }

    /// Looks up a certificate by its number.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] when the number is unknown.
    pub async fn find_by_number(&self, cert_number: &str) -> Result<Certificate, ApiError> {
        self.client
            .get(&format!("/api/certificates/{cert_number}"))
            .await
    }

    /// Downloads the generated certificate PDF.
    ///
    /// Uses the client's binary-download path: longer timeout, success-side
    /// binary verification, and message recovery from error bodies. A
    /// non-PDF binary type is tolerated with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on failure; when the server substituted a JSON
    /// error body for the file, the error carries the server's message.
    pub async fn download_pdf(&self, cert_number: &str) -> Result<BinaryPayload, ApiError> {
        let payload = self
            .client
            .download(&format!("/api/certificates/download/{cert_number}"))
            .await?;

        if !payload.bytes.is_empty()
            && payload
                .content_type
                .as_deref()
                .is_some_and(|value| !value.starts_with("application/pdf"))
        {
            warn!(
                cert_number,
                content_type = payload.content_type.as_deref().unwrap_or(""),
                "certificate download is not a PDF"
            );
        }

        Ok(payload)
    }
}
