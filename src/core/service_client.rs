// src/core/service_client.rs
//! HTTP gateway to the analysis backend - one request per call, no retries

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use std::time::Duration;
use tracing::{error, info, info_span, trace, Instrument};

use crate::error::GatewayError;
use crate::types::{
    AnalysisResult, AnalyzeResponse, CoverLetterRequest, CoverLetterResponse, PdfRequest,
};
use crate::upload::UploadedResume;

const ANALYZE_ENDPOINT: &str = "/analyze";
const COVER_LETTER_ENDPOINT: &str = "/generate_cover_letter";
const PDF_ENDPOINT: &str = "/generate_pdf";

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// The three backend operations the workflow depends on.
#[async_trait]
pub trait ResumeBackend: Send + Sync {
    async fn analyze(
        &self,
        resume: &UploadedResume,
        job_description: &str,
    ) -> Result<AnalysisResult, GatewayError>;

    async fn generate_cover_letter(
        &self,
        request: &CoverLetterRequest,
    ) -> Result<String, GatewayError>;

    async fn generate_pdf(&self, text: &str) -> Result<Bytes, GatewayError>;
}

pub struct ServiceClient {
    client: reqwest::Client,
    base_url: String,
    timeout_seconds: u64,
}

impl ServiceClient {
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_seconds,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn transport_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.timeout_seconds)
        } else {
            GatewayError::Network(e.to_string())
        }
    }

    /// Passes 2xx responses through; anything else becomes `Http` with the raw body.
    async fn check_status(&self, response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        trace!("Response status: {}", status);
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!("Backend error response {}: {}", status, body);
        Err(GatewayError::Http {
            status: status.as_u16(),
            body,
        })
    }

    async fn read_json<R: serde::de::DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<R, GatewayError> {
        let response_text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        serde_json::from_str(&response_text).map_err(|e| {
            GatewayError::Protocol(format!(
                "Invalid response from server: {}. Raw response: {}",
                e, response_text
            ))
        })
    }
}

#[async_trait]
impl ResumeBackend for ServiceClient {
    async fn analyze(
        &self,
        resume: &UploadedResume,
        job_description: &str,
    ) -> Result<AnalysisResult, GatewayError> {
        let url = self.url(ANALYZE_ENDPOINT);
        let span = info_span!("analyze", resume = %resume.name(), size = resume.size_bytes());

        async {
            let part = Part::bytes(resume.bytes().to_vec())
                .file_name(resume.name().to_string())
                .mime_str(resume.mime_type())
                .map_err(|e| GatewayError::Network(format!("Failed to create multipart: {}", e)))?;
            let form = Form::new()
                .part("resume", part)
                .text("job_description", job_description.trim().to_string());

            info!("Calling analysis service: {}", url);

            let response = self
                .client
                .post(&url)
                .multipart(form)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;
            let response = self.check_status(response).await?;
            let data: AnalyzeResponse = self.read_json(response).await?;

            let resume_text = data
                .resume_text
                .filter(|text| !text.trim().is_empty())
                .ok_or_else(|| {
                    GatewayError::Protocol(
                        "Invalid response from server: Missing resume text.".to_string(),
                    )
                })?;

            let missing_keywords = data
                .missing_keywords
                .map(|keywords| keywords.into_keywords())
                .unwrap_or_default();

            info!("Analysis returned {} missing keywords", missing_keywords.len());

            Ok::<_, GatewayError>(AnalysisResult {
                resume_text,
                missing_keywords,
                suggestions: data.suggestions.unwrap_or_default(),
            })
        }
        .instrument(span)
        .await
    }

    async fn generate_cover_letter(
        &self,
        request: &CoverLetterRequest,
    ) -> Result<String, GatewayError> {
        let url = self.url(COVER_LETTER_ENDPOINT);
        trace!("Calling cover letter service: {}", url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = self.check_status(response).await?;
        let data: CoverLetterResponse = self.read_json(response).await?;

        data.cover_letter
            .filter(|letter| !letter.trim().is_empty())
            .ok_or_else(|| {
                GatewayError::Protocol("No cover letter was returned from the server.".to_string())
            })
    }

    async fn generate_pdf(&self, text: &str) -> Result<Bytes, GatewayError> {
        let url = self.url(PDF_ENDPOINT);
        trace!("Calling PDF service: {}", url);

        let payload = PdfRequest {
            text: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = self.check_status(response).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        if body.is_empty() {
            return Err(GatewayError::Protocol(
                "The server returned an empty file.".to_string(),
            ));
        }

        info!("Received PDF ({} bytes)", body.len());
        Ok(body)
    }
}
