//! Helpers for exercising the token exchange without a network.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::{Ready, ready};
use futures::stream::{Iter, iter};
use parking_lot::Mutex;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Method, Request, StatusCode};
use sheetfront_error::Result;

use super::SPREADSHEETS_SCOPE;
use super::credentials::{ServiceAccount, ServiceAccountKey};
use crate::client::{HttpClient, HttpResponse};

/// 2048 bit RSA key generated for tests only.
pub const TEST_KEY_PEM: &str = include_str!("../../testdata/test_key.pem");

pub const TEST_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

pub fn test_key() -> ServiceAccountKey {
    let raw = serde_json::json!({
        "client_email": "bot@proj.iam.gserviceaccount.com",
        "private_key": TEST_KEY_PEM,
        "token_uri": TEST_TOKEN_URI,
    })
    .to_string();
    let account = ServiceAccount::try_from_str(&raw).unwrap();
    ServiceAccountKey::try_new(account, SPREADSHEETS_SCOPE).unwrap()
}

#[derive(Debug)]
pub struct SeenRequest {
    pub method: Method,
    pub url: String,
    pub content_type: Option<String>,
    pub body: String,
}

/// Client that replays canned responses and records requests.
#[derive(Debug, Clone, Default)]
pub struct ReplayClient {
    responses: Arc<Mutex<VecDeque<(StatusCode, &'static str)>>>,
    pub seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl ReplayClient {
    pub fn respond(&self, status: StatusCode, body: &'static str) -> &Self {
        self.responses.lock().push_back((status, body));
        self
    }
}

#[derive(Debug)]
pub struct ReplayResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: &'static str,
}

impl HttpResponse for ReplayResponse {
    type BytesStream = Iter<std::vec::IntoIter<Result<Bytes>>>;

    fn status(&self) -> StatusCode {
        self.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn into_bytes_stream(self) -> Self::BytesStream {
        iter(vec![Ok(Bytes::from_static(self.body.as_bytes()))])
    }
}

impl HttpClient for ReplayClient {
    type Response = ReplayResponse;
    type RequestFuture = Ready<Result<ReplayResponse>>;

    fn do_request(&self, request: Request) -> Self::RequestFuture {
        self.seen.lock().push(SeenRequest {
            method: request.method().clone(),
            url: request.url().to_string(),
            content_type: request
                .headers()
                .get(CONTENT_TYPE)
                .map(|v| v.to_str().unwrap().to_string()),
            body: request
                .body()
                .and_then(|b| b.as_bytes())
                .map(|b| String::from_utf8(b.to_vec()).unwrap())
                .unwrap_or_default(),
        });
        let (status, body) = self
            .responses
            .lock()
            .pop_front()
            .unwrap_or((StatusCode::OK, "{}"));
        ready(Ok(ReplayResponse {
            status,
            headers: HeaderMap::new(),
            body,
        }))
    }
}
