use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, Request};
use serde::{Deserialize, Serialize};
use sheetfront_error::{FrontError, Result, ResultExt};
use sheetfront_http::client::{
    HttpClient, HttpResponse, read_json_response, read_text_response, set_json_body,
};
use sheetfront_http::google::token::TokenSource;
use tracing::debug;
use url::Url;

use crate::api::{SheetsApi, ValueRenderOption};
use crate::range::A1Range;
use crate::value::CellValue;

pub const SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Characters left as-is when encoding a range into a path segment.
const RANGE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<CellValue>>,
}

#[derive(Debug, Serialize)]
struct ValuesBody<'a> {
    values: &'a [Vec<CellValue>],
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    message: String,
}

/// Client for the values endpoints of the Sheets v4 REST API.
#[derive(Debug)]
pub struct SheetsClient<C: HttpClient> {
    client: C,
    tokens: TokenSource<C>,
    endpoint: String,
    spreadsheet_id: String,
}

impl<C> SheetsClient<C>
where
    C: HttpClient,
{
    pub fn new(client: C, tokens: TokenSource<C>, spreadsheet_id: impl Into<String>) -> Self {
        Self::with_endpoint(client, tokens, spreadsheet_id, SHEETS_ENDPOINT)
    }

    pub fn with_endpoint(
        client: C,
        tokens: TokenSource<C>,
        spreadsheet_id: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        SheetsClient {
            client,
            tokens,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    fn values_url(&self, range: &A1Range, suffix: &str, query: &[(&str, &str)]) -> Result<Url> {
        let range = range.to_string();
        let raw = format!(
            "{}/{}/values/{}{}",
            self.endpoint,
            utf8_percent_encode(&self.spreadsheet_id, RANGE_ENCODE_SET),
            utf8_percent_encode(&range, RANGE_ENCODE_SET),
            suffix,
        );
        let mut url = Url::parse(&raw).context_fn(|| format!("Failed to parse url: {raw}"))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn new_request(&self, method: Method, url: Url) -> Result<Request> {
        let token = self.tokens.bearer_token().await?;
        let mut request = Request::new(method, url);
        let header = HeaderValue::from_str(&format!("Bearer {token}"))
            .context("Failed to create authorization header")?;
        request.headers_mut().insert(AUTHORIZATION, header);
        Ok(request)
    }

    /// Send the request, turning error statuses into errors.
    async fn send(&self, request: Request, range: &A1Range) -> Result<C::Response> {
        debug!(method = %request.method(), url = %request.url(), "sheets request");
        let resp = self.client.do_request(request).await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = read_text_response(resp.into_bytes_stream()).await?;
        let msg = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => err.error.message,
            Err(_) => "Sheets API request failed".to_string(),
        };

        Err(FrontError::new(msg)
            .with_field("status", status)
            .with_field("range", range))
    }
}

#[async_trait]
impl<C> SheetsApi for SheetsClient<C>
where
    C: HttpClient,
{
    async fn get_values(
        &self,
        range: &A1Range,
        render: ValueRenderOption,
    ) -> Result<Vec<Vec<CellValue>>> {
        let url = self.values_url(range, "", &[("valueRenderOption", render.as_str())])?;
        let request = self.new_request(Method::GET, url).await?;
        let resp = self.send(request, range).await?;

        let values: ValueRange = read_json_response(resp.into_bytes_stream()).await?;
        Ok(values.values)
    }

    async fn update_values(&self, range: &A1Range, rows: Vec<Vec<CellValue>>) -> Result<()> {
        let url = self.values_url(range, "", &[("valueInputOption", "RAW")])?;
        let mut request = self.new_request(Method::PUT, url).await?;
        set_json_body(&mut request, &ValuesBody { values: &rows })?;
        self.send(request, range).await?;
        Ok(())
    }

    async fn append_values(&self, range: &A1Range, rows: Vec<Vec<CellValue>>) -> Result<()> {
        let url = self.values_url(
            range,
            ":append",
            &[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ],
        )?;
        let mut request = self.new_request(Method::POST, url).await?;
        set_json_body(&mut request, &ValuesBody { values: &rows })?;
        self.send(request, range).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use bytes::Bytes;
    use futures::future::{Ready, ready};
    use futures::stream::{Iter, iter};
    use parking_lot::Mutex;
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;

    use super::*;

    #[derive(Debug)]
    struct SeenRequest {
        method: Method,
        url: String,
        auth: Option<String>,
        body: Option<String>,
    }

    /// Client that replays canned responses and records requests.
    #[derive(Debug, Clone, Default)]
    struct ReplayClient {
        responses: Arc<Mutex<VecDeque<(StatusCode, &'static str)>>>,
        seen: Arc<Mutex<Vec<SeenRequest>>>,
    }

    impl ReplayClient {
        fn respond(&self, status: StatusCode, body: &'static str) -> &Self {
            self.responses.lock().push_back((status, body));
            self
        }
    }

    #[derive(Debug)]
    struct ReplayResponse {
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
                auth: request
                    .headers()
                    .get(AUTHORIZATION)
                    .map(|v| v.to_str().unwrap().to_string()),
                body: request
                    .body()
                    .and_then(|b| b.as_bytes())
                    .map(|b| String::from_utf8(b.to_vec()).unwrap()),
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

    fn sheets_client(http: &ReplayClient) -> SheetsClient<ReplayClient> {
        SheetsClient::new(http.clone(), TokenSource::fixed("tok"), "doc123")
    }

    #[tokio::test]
    async fn get_values_unformatted() {
        let http = ReplayClient::default();
        http.respond(
            StatusCode::OK,
            r#"{"range": "Sheet1!A1:Z3", "majorDimension": "ROWS", "values": [["a", "b"], [1, 2]]}"#,
        );

        let rows = sheets_client(&http)
            .get_values(&A1Range::columns("Sheet1"), ValueRenderOption::Unformatted)
            .await
            .unwrap();
        assert_eq!(
            vec![
                vec![CellValue::from("a"), CellValue::from("b")],
                vec![CellValue::from(1), CellValue::from(2)],
            ],
            rows
        );

        let seen = http.seen.lock();
        assert_eq!(Method::GET, seen[0].method);
        assert_eq!(
            "https://sheets.googleapis.com/v4/spreadsheets/doc123/values/Sheet1!A%3AZ?valueRenderOption=UNFORMATTED_VALUE",
            seen[0].url
        );
        assert_eq!(Some("Bearer tok"), seen[0].auth.as_deref());
    }

    #[tokio::test]
    async fn get_values_empty_range() {
        let http = ReplayClient::default();
        http.respond(StatusCode::OK, r#"{"range": "Sheet1!A1:Z1", "majorDimension": "ROWS"}"#);

        let rows = sheets_client(&http)
            .get_values(&A1Range::header_row("Sheet1"), ValueRenderOption::Formatted)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn quoted_range_is_encoded() {
        let http = ReplayClient::default();
        http.respond(StatusCode::OK, "{}");

        sheets_client(&http)
            .get_values(&A1Range::header_row("My Tab"), ValueRenderOption::Formatted)
            .await
            .unwrap();

        let seen = http.seen.lock();
        assert_eq!(
            "https://sheets.googleapis.com/v4/spreadsheets/doc123/values/'My%20Tab'!A1%3AZ1?valueRenderOption=FORMATTED_VALUE",
            seen[0].url
        );
    }

    #[tokio::test]
    async fn append_values_request() {
        let http = ReplayClient::default();
        sheets_client(&http)
            .append_values(
                &A1Range::columns("Sheet2"),
                vec![vec![CellValue::from(7), CellValue::from("hi")]],
            )
            .await
            .unwrap();

        let seen = http.seen.lock();
        assert_eq!(Method::POST, seen[0].method);
        assert_eq!(
            "https://sheets.googleapis.com/v4/spreadsheets/doc123/values/Sheet2!A%3AZ:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
            seen[0].url
        );
        assert_eq!(Some(r#"{"values":[[7,"hi"]]}"#), seen[0].body.as_deref());
    }

    #[tokio::test]
    async fn update_values_request() {
        let http = ReplayClient::default();
        sheets_client(&http)
            .update_values(&A1Range::origin("Sheet1"), vec![vec![CellValue::from("id")]])
            .await
            .unwrap();

        let seen = http.seen.lock();
        assert_eq!(Method::PUT, seen[0].method);
        assert_eq!(
            "https://sheets.googleapis.com/v4/spreadsheets/doc123/values/Sheet1!A1?valueInputOption=RAW",
            seen[0].url
        );
        assert_eq!(Some(r#"{"values":[["id"]]}"#), seen[0].body.as_deref());
    }

    #[tokio::test]
    async fn error_status_uses_google_message() {
        let http = ReplayClient::default();
        http.respond(
            StatusCode::BAD_REQUEST,
            r#"{"error": {"code": 400, "message": "Unable to parse range: Nope!A:Z", "status": "INVALID_ARGUMENT"}}"#,
        );

        let err = sheets_client(&http)
            .get_values(&A1Range::columns("Nope"), ValueRenderOption::Unformatted)
            .await
            .unwrap_err();
        assert_eq!("Unable to parse range: Nope!A:Z", err.get_msg());
        assert_eq!(Some("400 Bad Request"), err.get_field("status"));
        assert_eq!(Some("Nope!A:Z"), err.get_field("range"));
    }

    #[tokio::test]
    async fn error_status_without_json_body() {
        let http = ReplayClient::default();
        http.respond(StatusCode::BAD_GATEWAY, "upstream unavailable");

        let err = sheets_client(&http)
            .append_values(&A1Range::columns("Sheet1"), Vec::new())
            .await
            .unwrap_err();
        assert_eq!("Sheets API request failed", err.get_msg());
        assert_eq!(Some("502 Bad Gateway"), err.get_field("status"));
    }
}
