mod common;

use axum::http::StatusCode;
use common::{StubBackend, StubResponses};
use resume_optimizer::error::GatewayError;
use resume_optimizer::types::CoverLetterRequest;
use resume_optimizer::upload::{FileCandidate, ResumeValidator, UploadedResume, PDF_MIME};
use resume_optimizer::{ResumeBackend, ServiceClient};
use serde_json::json;

fn resume(size: usize) -> UploadedResume {
    ResumeValidator::validate(FileCandidate::new("resume.pdf", PDF_MIME, vec![b'%'; size])).unwrap()
}

fn client(stub: &StubBackend) -> ServiceClient {
    ServiceClient::new(&stub.base_url, 10).unwrap()
}

#[tokio::test]
async fn test_analyze_sends_multipart_and_normalizes_keywords() {
    let stub = StubBackend::spawn(StubResponses::default()).await;

    let analysis = client(&stub)
        .analyze(&resume(2 * 1024 * 1024), "  Senior Go engineer \n")
        .await
        .unwrap();

    assert_eq!(analysis.resume_text, "Built payment services in Go.");
    assert_eq!(analysis.missing_keywords, vec!["Kafka", "Terraform"]);

    let calls = stub.recorded.analyze.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].file_name.as_deref(), Some("resume.pdf"));
    assert_eq!(calls[0].content_type.as_deref(), Some(PDF_MIME));
    assert_eq!(calls[0].size, 2 * 1024 * 1024);
    assert_eq!(calls[0].job_description, "Senior Go engineer");
}

#[tokio::test]
async fn test_analyze_accepts_comma_string_keywords() {
    let stub = StubBackend::spawn(StubResponses {
        analyze: (
            StatusCode::OK,
            json!({
                "resume_text": "text",
                "missing_keywords": "Kafka, Terraform,  ",
                "suggestions": "",
            })
            .to_string(),
        ),
        ..StubResponses::default()
    })
    .await;

    let analysis = client(&stub).analyze(&resume(16), "jd").await.unwrap();
    assert_eq!(analysis.missing_keywords, vec!["Kafka", "Terraform"]);
}

#[tokio::test]
async fn test_missing_resume_text_is_protocol_error() {
    let stub = StubBackend::spawn(StubResponses {
        analyze: (
            StatusCode::OK,
            json!({ "missing_keywords": [], "suggestions": "x" }).to_string(),
        ),
        ..StubResponses::default()
    })
    .await;

    let err = client(&stub).analyze(&resume(16), "jd").await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Protocol("Invalid response from server: Missing resume text.".to_string())
    );
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let stub = StubBackend::spawn(StubResponses {
        analyze: (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Could not extract text from PDF".to_string(),
        ),
        ..StubResponses::default()
    })
    .await;

    let err = client(&stub).analyze(&resume(16), "jd").await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Http {
            status: 422,
            body: "Could not extract text from PDF".to_string()
        }
    );
    assert_eq!(err.to_string(), "Server error: 422 - Could not extract text from PDF");
}

#[tokio::test]
async fn test_cover_letter_request_body() {
    let stub = StubBackend::spawn(StubResponses::default()).await;
    let request = CoverLetterRequest {
        resume_text: "text".to_string(),
        job_description: "jd".to_string(),
        missing_keywords: "A, B".to_string(),
    };

    let letter = client(&stub).generate_cover_letter(&request).await.unwrap();
    assert!(letter.starts_with("Dear Hiring Manager"));

    let bodies = stub.recorded.letters.lock().unwrap();
    assert_eq!(
        bodies[0],
        json!({ "resume_text": "text", "job_description": "jd", "missing_keywords": "A, B" })
    );
}

#[tokio::test]
async fn test_blank_cover_letter_is_protocol_error() {
    let stub = StubBackend::spawn(StubResponses {
        letter: (StatusCode::OK, json!({ "cover_letter": "  " }).to_string()),
        ..StubResponses::default()
    })
    .await;
    let request = CoverLetterRequest {
        resume_text: "text".to_string(),
        job_description: "jd".to_string(),
        missing_keywords: String::new(),
    };

    let err = client(&stub).generate_cover_letter(&request).await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Protocol("No cover letter was returned from the server.".to_string())
    );
}

#[tokio::test]
async fn test_pdf_bytes_and_empty_body() {
    let stub = StubBackend::spawn(StubResponses::default()).await;
    let bytes = client(&stub).generate_pdf("Dear team").await.unwrap();
    assert_eq!(&bytes[..], b"%PDF-1.4 stub");
    assert_eq!(stub.recorded.pdfs.lock().unwrap()[0], json!({ "text": "Dear team" }));

    let empty = StubBackend::spawn(StubResponses {
        pdf: (StatusCode::OK, Vec::new()),
        ..StubResponses::default()
    })
    .await;
    let err = client(&empty).generate_pdf("Dear team").await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Protocol("The server returned an empty file.".to_string())
    );
}

#[tokio::test]
async fn test_hung_backend_times_out() {
    let app = axum::Router::new().route(
        "/generate_pdf",
        axum::routing::post(|| async {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            "too late"
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = ServiceClient::new(format!("http://{}", addr), 1).unwrap();
    let started = std::time::Instant::now();
    let err = client.generate_pdf("Dear team").await.unwrap_err();

    assert_eq!(err, GatewayError::Timeout(1));
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
}
