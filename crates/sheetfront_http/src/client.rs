use std::fmt::Debug;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt, TryStreamExt};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Request, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sheetfront_error::{Result, ResultExt};

pub trait HttpClient: Sync + Send + Debug + Clone + 'static {
    type Response: HttpResponse;
    type RequestFuture: Future<Output = Result<Self::Response>> + Send + Unpin;

    /// Do the request.
    fn do_request(&self, request: Request) -> Self::RequestFuture;
}

pub trait HttpResponse: Send {
    type BytesStream: Stream<Item = Result<Bytes>> + Send + Unpin;

    fn status(&self) -> StatusCode;
    fn headers(&self) -> &HeaderMap;

    /// Convert the response body into a byte stream.
    fn into_bytes_stream(self) -> Self::BytesStream;
}

/// Http client backed by reqwest.
///
/// Cloning is cheap, clones share the same connection pool.
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient(pub reqwest::Client);

impl HttpClient for ReqwestClient {
    type Response = ReqwestResponse;
    type RequestFuture = BoxFuture<'static, Result<Self::Response>>;

    fn do_request(&self, request: Request) -> Self::RequestFuture {
        let client = self.0.clone();
        async move {
            let resp = client
                .execute(request)
                .await
                .context("Failed to send request")?;
            Ok(ReqwestResponse(resp))
        }
        .boxed()
    }
}

#[derive(Debug)]
pub struct ReqwestResponse(reqwest::Response);

impl HttpResponse for ReqwestResponse {
    type BytesStream = BoxStream<'static, Result<Bytes>>;

    fn status(&self) -> StatusCode {
        self.0.status()
    }

    fn headers(&self) -> &HeaderMap {
        self.0.headers()
    }

    fn into_bytes_stream(self) -> Self::BytesStream {
        self.0
            .bytes_stream()
            .map(|result| result.context("Failed to read response body"))
            .boxed()
    }
}

/// Helper to set a json body on this request.
///
/// Overwrites the existing body and 'Content-Type' of the request.
pub fn set_json_body<T>(request: &mut Request, body: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec(body).context("Failed to serialize request body to json")?;
    *request.body_mut() = Some(body.into());
    request
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(())
}

/// Helper to set a form body on this request.
///
/// Overwrites the existing body and 'Content-Type' of the request.
pub fn set_form_body<T>(request: &mut Request, body: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let body = serde_urlencoded::to_string(body)
        .context("Failed to serialize request body to url encoded form")?;
    *request.body_mut() = Some(body.into());
    request.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );

    Ok(())
}

async fn read_body<S>(mut stream: S) -> Result<Vec<u8>>
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin,
{
    let mut bytes = Vec::new();
    while let Some(resp) = stream.try_next().await? {
        bytes.extend_from_slice(resp.as_ref());
    }
    Ok(bytes)
}

/// Helper to read a json response from a byte stream.
///
/// This will collect the full response before trying to deserialize it.
pub async fn read_json_response<T, S>(stream: S) -> Result<T>
where
    T: DeserializeOwned,
    S: Stream<Item = Result<Bytes>> + Send + Unpin,
{
    let bytes = read_body(stream).await?;
    serde_json::from_slice(&bytes).context("Failed to deserialize response body as json")
}

/// Helper to read a response body as text, replacing invalid utf8.
pub async fn read_text_response<S>(stream: S) -> Result<String>
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin,
{
    let bytes = read_body(stream).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use reqwest::Method;
    use serde::Deserialize;
    use url::Url;

    use super::*;

    #[test]
    fn json_body_sets_content_type() {
        let mut req = Request::new(Method::POST, Url::parse("http://localhost/").unwrap());
        set_json_body(&mut req, &serde_json::json!({"values": [[1, "a"]]})).unwrap();

        assert_eq!("application/json", req.headers()[CONTENT_TYPE]);
        let body = req.body().unwrap().as_bytes().unwrap();
        assert_eq!(br#"{"values":[[1,"a"]]}"#, body);
    }

    #[test]
    fn form_body_is_urlencoded() {
        let mut req = Request::new(Method::POST, Url::parse("http://localhost/").unwrap());
        set_form_body(&mut req, &[("grant_type", "a b"), ("assertion", "x.y")]).unwrap();

        assert_eq!(
            "application/x-www-form-urlencoded",
            req.headers()[CONTENT_TYPE]
        );
        let body = req.body().unwrap().as_bytes().unwrap();
        assert_eq!(b"grant_type=a+b&assertion=x.y", body);
    }

    #[tokio::test]
    async fn read_json_across_chunks() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Token {
            access_token: String,
        }

        let chunks = vec![
            Ok(Bytes::from_static(b"{\"access_")),
            Ok(Bytes::from_static(b"token\":\"abc\"}")),
        ];
        let tok: Token = read_json_response(stream::iter(chunks)).await.unwrap();
        assert_eq!("abc", tok.access_token);
    }
}
