//! Response finalization

use canary_core::CoreError;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Response, StatusCode};
use schema::{Envelope, FileEntry};
use tracing::error;

/// Successful handler result, before the instance label is stamped on
#[derive(Debug)]
pub enum Outcome {
    Message(String),
    Listing(Vec<FileEntry>),
}

/// Turn a handler result into the JSON response sent to the caller.
///
/// Errors are logged in full here and replaced by the generic envelope; no
/// internal detail reaches the body.
pub fn finalize(pod: &str, outcome: Result<Outcome, CoreError>) -> Response<Body> {
    let (status, envelope) = match outcome {
        Ok(Outcome::Message(message)) => (StatusCode::OK, Envelope::message(pod, message)),
        Ok(Outcome::Listing(files)) => (StatusCode::OK, Envelope::listing(pod, files)),
        Err(e) => {
            error!(error = %e, code = e.code(), "request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Envelope::failure(pod))
        }
    };

    let body = match serde_json::to_vec(&envelope) {
        Ok(mut bytes) => {
            bytes.push(b'\n');
            Body::from(bytes)
        }
        Err(e) => {
            error!("Error writing response: {}", e);
            Body::empty()
        }
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Bodiless response with the given status
pub fn empty(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use canary_core::nfs::NfsError;
    use std::time::Duration;

    async fn body_string(response: Response<Body>) -> String {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn message_outcome_is_200_json() {
        let response = finalize("pod-1", Ok(Outcome::Message("hello".into())));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(
            body_string(response).await,
            "{\"pod\":\"pod-1\",\"message\":\"hello\"}\n"
        );
    }

    #[tokio::test]
    async fn error_detail_never_reaches_the_body() {
        let err = CoreError::Listing {
            path: "/secret/path".into(),
            source: NfsError::Timeout(Duration::from_secs(20)),
        };
        let response = finalize("", Err(err));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let body = body_string(response).await;
        assert_eq!(body, "{\"pod\":\"\",\"error\":\"something went wrong\"}\n");
        assert!(!body.contains("secret"));
    }

    #[tokio::test]
    async fn empty_listing_keeps_files_key() {
        let response = finalize("p", Ok(Outcome::Listing(vec![])));
        assert_eq!(body_string(response).await, "{\"pod\":\"p\",\"files\":[]}\n");
    }

    #[tokio::test]
    async fn empty_has_no_body() {
        let response = empty(StatusCode::NOT_FOUND);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(response).await.is_empty());
    }
}
