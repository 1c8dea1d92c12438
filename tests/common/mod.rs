//! In-process stand-in for the analysis backend.
#![allow(dead_code)]

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Debug, Clone, Default)]
pub struct AnalyzeCall {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
    pub job_description: String,
}

#[derive(Clone)]
pub struct StubResponses {
    pub analyze: (StatusCode, String),
    pub letter: (StatusCode, String),
    pub pdf: (StatusCode, Vec<u8>),
}

impl Default for StubResponses {
    fn default() -> Self {
        Self {
            analyze: (
                StatusCode::OK,
                json!({
                    "resume_text": "Built payment services in Go.",
                    "missing_keywords": ["Kafka", "Terraform"],
                    "suggestions": "Mention event streaming experience.",
                })
                .to_string(),
            ),
            letter: (
                StatusCode::OK,
                json!({ "cover_letter": "Dear Hiring Manager,\n\nI am excited to apply.\n\nSincerely," })
                    .to_string(),
            ),
            pdf: (StatusCode::OK, b"%PDF-1.4 stub".to_vec()),
        }
    }
}

#[derive(Default)]
pub struct Recorded {
    pub analyze: Mutex<Vec<AnalyzeCall>>,
    pub letters: Mutex<Vec<Value>>,
    pub pdfs: Mutex<Vec<Value>>,
}

struct Shared {
    responses: StubResponses,
    recorded: Arc<Recorded>,
}

pub struct StubBackend {
    pub base_url: String,
    pub recorded: Arc<Recorded>,
}

impl StubBackend {
    pub async fn spawn(responses: StubResponses) -> Self {
        let recorded = Arc::new(Recorded::default());
        let shared = Arc::new(Shared {
            responses,
            recorded: recorded.clone(),
        });

        let app = Router::new()
            .route("/analyze", post(analyze))
            .route("/generate_cover_letter", post(cover_letter))
            .route("/generate_pdf", post(pdf))
            .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
            .with_state(shared);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            recorded,
        }
    }
}

fn json_response(status: StatusCode, body: &str) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body.to_string()).into_response()
}

async fn analyze(State(shared): State<Arc<Shared>>, mut multipart: Multipart) -> Response {
    let mut call = AnalyzeCall::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("resume") => {
                call.file_name = field.file_name().map(str::to_string);
                call.content_type = field.content_type().map(str::to_string);
                call.size = field.bytes().await.map(|b| b.len()).unwrap_or(0);
            }
            Some("job_description") => {
                call.job_description = field.text().await.unwrap_or_default();
            }
            _ => {}
        }
    }
    shared.recorded.analyze.lock().unwrap().push(call);

    let (status, body) = &shared.responses.analyze;
    json_response(*status, body)
}

async fn cover_letter(State(shared): State<Arc<Shared>>, Json(body): Json<Value>) -> Response {
    shared.recorded.letters.lock().unwrap().push(body);
    let (status, body) = &shared.responses.letter;
    json_response(*status, body)
}

async fn pdf(State(shared): State<Arc<Shared>>, Json(body): Json<Value>) -> Response {
    shared.recorded.pdfs.lock().unwrap().push(body);
    let (status, bytes) = &shared.responses.pdf;
    (*status, [(header::CONTENT_TYPE, "application/pdf")], bytes.clone()).into_response()
}
