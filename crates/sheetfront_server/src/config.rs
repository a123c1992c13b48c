use std::io;
use std::path::PathBuf;

use axum::http::HeaderValue;
use clap::Parser;
use sheetfront_error::{FrontError, OptionExt, Result, ResultExt};
use sheetfront_http::google::SPREADSHEETS_SCOPE;
use sheetfront_http::google::credentials::{ServiceAccount, ServiceAccountKey};

#[derive(Debug, Parser)]
#[clap(name = "sheetfront")]
pub struct Arguments {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Origin allowed by CORS, '*' allows any origin.
    #[arg(long, env = "ALLOWED_ORIGIN", default_value = "*")]
    pub allowed_origin: String,

    /// Service account key json used to access the spreadsheet.
    #[arg(long, env = "GOOGLE_CREDENTIALS", hide_env_values = true)]
    pub google_credentials: Option<String>,

    /// Id of the spreadsheet backing the API.
    #[arg(long, env = "SHEET_ID")]
    pub sheet_id: Option<String>,

    /// Log output format, 'human' or 'json'.
    #[arg(long, env = "LOG_FORMAT", default_value = "human")]
    pub log_format: logutil::LogFormat,

    /// Serve from an in-memory spreadsheet instead of Google Sheets.
    ///
    /// Credentials and sheet id are not needed in this mode.
    #[arg(long)]
    pub in_memory: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigin {
    Any,
    Exact(HeaderValue),
}

impl AllowedOrigin {
    pub fn try_from_str(s: &str) -> Result<Self> {
        if s == "*" {
            return Ok(AllowedOrigin::Any);
        }
        let value = HeaderValue::from_str(s).context_fn(|| format!("Invalid ALLOWED_ORIGIN: {s}"))?;
        Ok(AllowedOrigin::Exact(value))
    }
}

#[derive(Debug)]
pub enum Backend {
    Google {
        key: ServiceAccountKey,
        sheet_id: String,
    },
    InMemory,
}

/// Configuration for the server, validated before anything is served.
#[derive(Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub allowed_origin: AllowedOrigin,
    pub backend: Backend,
}

impl ServerConfig {
    pub fn try_from_args(args: Arguments) -> Result<Self> {
        let allowed_origin = AllowedOrigin::try_from_str(&args.allowed_origin)?;

        let backend = if args.in_memory {
            Backend::InMemory
        } else {
            let raw = non_empty(args.google_credentials)
                .required("Missing GOOGLE_CREDENTIALS env var.")?;
            let key = parse_credentials(&raw)?;
            let sheet_id = non_empty(args.sheet_id).required("Missing SHEET_ID env var.")?;
            Backend::Google { key, sheet_id }
        };

        Ok(ServerConfig {
            port: args.port,
            allowed_origin,
            backend,
        })
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

/// Parse the service account json and its private key.
pub fn parse_credentials(raw: &str) -> Result<ServiceAccountKey> {
    serde_json::from_str::<serde_json::Value>(raw).context("GOOGLE_CREDENTIALS is not valid JSON.")?;

    let account = ServiceAccount::try_from_str(raw).map_err(|e| {
        FrontError::with_source("GOOGLE_CREDENTIALS is not a service account key.", Box::new(e))
    })?;
    ServiceAccountKey::try_new(account, SPREADSHEETS_SCOPE).map_err(|e| {
        FrontError::with_source("GOOGLE_CREDENTIALS has an invalid private key.", Box::new(e))
    })
}

/// Load a `.env` file from the current directory or its parents into the
/// environment. A missing file is fine, an unreadable or malformed one is not.
pub fn load_env_file() -> Result<()> {
    check_env_file(dotenvy::dotenv())
}

fn check_env_file(loaded: std::result::Result<PathBuf, dotenvy::Error>) -> Result<()> {
    match loaded {
        Ok(_) => Ok(()),
        Err(dotenvy::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FrontError::with_source("Failed to load .env file", Box::new(e))),
    }
}
