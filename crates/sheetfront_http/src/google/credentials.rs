use std::fmt;

use base64::Engine;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Method, Request};
use ring::signature::RsaKeyPair;
use serde::{Deserialize, Serialize};
use sheetfront_error::{FrontError, Result, ResultExt};
use url::Url;

use crate::client::{HttpClient, HttpResponse, read_json_response, read_text_response, set_form_body};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Service account key as downloaded from the cloud console.
///
/// Only the fields needed for the jwt bearer flow are required.
#[derive(Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key", &"***")
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .finish()
    }
}

#[derive(Serialize)]
struct JwtHeader {
    alg: &'static str,
    typ: &'static str,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: u64,
    iat: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: u64,
}

impl ServiceAccount {
    pub fn try_from_str(input: &str) -> Result<Self> {
        serde_json::from_str(input).context("Failed to deserialize json service account key")
    }
}

/// A service account with its private key parsed and ready for signing.
pub struct ServiceAccountKey {
    account: ServiceAccount,
    key_pair: RsaKeyPair,
    scope: &'static str,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("account", &self.account)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn try_new(account: ServiceAccount, scope: &'static str) -> Result<Self> {
        let key_pair = parse_private_key(&account.private_key)?;
        Ok(ServiceAccountKey {
            account,
            key_pair,
            scope,
        })
    }

    pub fn account(&self) -> &ServiceAccount {
        &self.account
    }

    /// Create a signed jwt asserting this service account, valid for one
    /// hour from `now`.
    pub fn signed_jwt(&self, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp() as u64;
        let exp = (now + Duration::hours(1)).timestamp() as u64;

        let claims = JwtClaims {
            iss: &self.account.client_email,
            scope: self.scope,
            aud: &self.account.token_uri,
            iat,
            exp,
        };
        let signing_input = signing_input(&claims)?;

        // Sign with PKCS#1 v1.5 SHA-256 (RS256)
        let mut signature = vec![0; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(
                &ring::signature::RSA_PKCS1_SHA256,
                &ring::rand::SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|_| FrontError::new("Failed to sign payload"))?;

        let sig_b64 = BASE64_URL_SAFE_NO_PAD.encode(&signature);
        Ok(format!("{}.{}", signing_input, sig_b64))
    }

    /// Fetch an access token using this service account.
    pub async fn fetch_access_token<C>(&self, client: &C, now: DateTime<Utc>) -> Result<AccessToken>
    where
        C: HttpClient,
    {
        let jwt = self.signed_jwt(now)?;

        // Exchange the JWT for an access token
        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", &jwt),
        ];
        let url = Url::parse(&self.account.token_uri).context("Failed to parse token uri as url")?;
        let mut request = Request::new(Method::POST, url);
        set_form_body(&mut request, &params)?;

        let resp = client.do_request(request).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = read_text_response(resp.into_bytes_stream()).await?;
            return Err(FrontError::new("Failed to fetch access token")
                .with_field("status", status)
                .with_field("body", body));
        }

        read_json_response(resp.into_bytes_stream()).await
    }
}

fn signing_input(claims: &JwtClaims<'_>) -> Result<String> {
    let header = JwtHeader {
        alg: "RS256",
        typ: "JWT",
    };

    let header_b64 = BASE64_URL_SAFE_NO_PAD
        .encode(serde_json::to_string(&header).context("Failed to encode jwt header")?);
    let claims_b64 = BASE64_URL_SAFE_NO_PAD
        .encode(serde_json::to_string(claims).context("Failed to encode jwt claims")?);

    Ok(format!("{}.{}", header_b64, claims_b64))
}

fn parse_private_key(pem: &str) -> Result<RsaKeyPair> {
    let mut reader = std::io::Cursor::new(pem.as_bytes());
    let key = rustls_pemfile::read_one(&mut reader).context("invalid PEM private key")?;
    match key {
        Some(rustls_pemfile::Item::Pkcs8Key(der)) => RsaKeyPair::from_pkcs8(der.secret_pkcs8_der())
            .map_err(|_| FrontError::new("Failed to create rsa key pair from pkcs8 key")),
        Some(rustls_pemfile::Item::Pkcs1Key(der)) => RsaKeyPair::from_der(der.secret_pkcs1_der())
            .map_err(|_| FrontError::new("Failed to create rsa key pair from pkcs1 key")),
        _ => Err(FrontError::new("Missing key")),
    }
}
