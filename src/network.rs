use crate::constants::{
    AUDIO_EXTENSION, DOWNLOAD_PATH, DOWNLOAD_TIMEOUT_SECS, METADATA_PATH, METADATA_TIMEOUT_SECS,
    UNKNOWN_TITLE, USER_AGENT,
};
use crate::error::AppError;
use crate::models::Preview;

use regex::Regex;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Messages sent from background tasks back to the UI loop.
#[derive(Debug)]
pub enum TaskResponse {
    MetadataLoaded(Preview),
    MetadataFailed(AppError),
    DownloadProgress(u64, Option<u64>),
    DownloadSaved(String, PathBuf), // filename, full path
    DownloadFailed(AppError),
    ResetElapsed(u64),              // reset generation
}

#[derive(Deserialize)]
struct MetadataReply {
    title: Option<String>,
    thumbnail_url: Option<String>,
    url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorReply {
    error: Option<String>,
}

/// A successful `/download_mp3` reply whose body has not been read yet.
pub struct AudioDownload {
    pub filename: String,
    pub response: Response,
}

pub struct ServiceClient {
    client: Client,
    download_client: Client,
    base_url: Url,
}

impl ServiceClient {
    pub fn new(base_url: Url) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(METADATA_TIMEOUT_SECS))
            .build()?;

        let download_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            download_client,
            base_url: with_trailing_slash(base_url),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Network(format!("invalid server URL: {}", e)))
    }

    /// `POST /get_metadata` with the link as form field `url`.
    pub async fn fetch_metadata(&self, link: &str) -> Result<Preview, AppError> {
        let endpoint = self.endpoint(METADATA_PATH)?;
        info!(%link, "requesting metadata");

        let resp = self
            .client
            .post(endpoint)
            .form(&[("url", link)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(service_error(resp).await);
        }

        let reply: MetadataReply = resp.json().await?;
        Ok(Preview {
            title: reply.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            thumbnail_url: reply.thumbnail_url.unwrap_or_default(),
            canonical_url: reply.url.unwrap_or_else(|| link.to_string()),
        })
    }

    /// `POST /download_mp3` with form fields `url` and `title`.
    ///
    /// Only the headers have arrived when this returns; the caller streams
    /// the body.
    pub async fn request_download(&self, url: &str, title: &str) -> Result<AudioDownload, AppError> {
        let endpoint = self.endpoint(DOWNLOAD_PATH)?;
        info!(%url, %title, "requesting mp3 conversion");

        let resp = self
            .download_client
            .post(endpoint)
            .form(&[("url", url), ("title", title)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(service_error(resp).await);
        }

        let disposition = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok());
        let filename = download_filename(disposition, title);

        Ok(AudioDownload {
            filename,
            response: resp,
        })
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

async fn service_error(resp: Response) -> AppError {
    let status = resp.status();
    let message = match resp.json::<ErrorReply>().await {
        Ok(reply) => reply.error,
        Err(e) => {
            warn!(%status, "error reply without a JSON body: {}", e);
            None
        }
    };
    warn!(%status, error = ?message, "service rejected the request");
    AppError::Service(message)
}

/// Pulls the quoted `filename` out of a `Content-Disposition` value.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    static FILENAME_RE: OnceLock<Regex> = OnceLock::new();
    let re = FILENAME_RE.get_or_init(|| Regex::new(r#"filename="(.+?)""#).unwrap());

    re.captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Name the server picked, else `{title}.mp3`.
pub fn download_filename(content_disposition: Option<&str>, title: &str) -> String {
    content_disposition
        .and_then(filename_from_content_disposition)
        .unwrap_or_else(|| format!("{}.{}", title, AUDIO_EXTENSION))
}

/// Keeps a server- or title-derived name inside the output directory.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim();

    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        format!("download.{}", AUDIO_EXTENSION)
    } else {
        trimmed.to_string()
    }
}

/// `dir/name`, or `dir/stem (n).ext` when that file already exists.
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    (1..)
        .map(|n| match &ext {
            Some(ext) => dir.join(format!("{} ({}).{}", stem, n, ext)),
            None => dir.join(format!("{} ({})", stem, n)),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
