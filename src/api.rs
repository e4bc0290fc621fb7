use crate::config::Config;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:3000";

pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Transport(err) => err.status(),
            ApiError::Status { status, .. } => Some(*status),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(StatusCode::FORBIDDEN)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }
}

// --- Auth types ---

#[derive(Debug, Serialize)]
struct CredentialsRequest {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

// --- Listing types ---

/// A file or folder record returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Entry {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub name: String,
    #[serde(rename = "fullpath")]
    pub full_path: String,
    /// Raw wire timestamp; parsed only at render time.
    #[serde(rename = "upload_date", default)]
    pub upload_date: String,
    #[serde(rename = "filetype", default)]
    pub file_type: Option<String>,
    #[serde(rename = "filesize", default)]
    pub size: u64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "sha2")]
    pub md5: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    // older servers send "filename" for file rows
    #[serde(alias = "filename")]
    File,
    Folder,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let base = config
            .server_url
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVER.to_string());
        Self::new(&base, config.token.clone())
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Check response status; on error, read the body for a detail message.
    async fn ensure_ok(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(ApiError::Status {
                status,
                message: error_message(status, &body),
            })
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let resp = self
            .client
            .post(format!("{}/account/login", self.base_url))
            .json(&CredentialsRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let auth: AuthResponse = Self::ensure_ok(resp).await?.json().await?;
        Ok(auth.token)
    }

    pub async fn signup(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let resp = self
            .client
            .post(format!("{}/account/signup", self.base_url))
            .json(&CredentialsRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let auth: AuthResponse = Self::ensure_ok(resp).await?.json().await?;
        Ok(auth.token)
    }

    pub async fn list(&self, path: &str) -> Result<Vec<Entry>, ApiError> {
        let resp = self
            .authed(self.client.get(format!("{}/list/", self.base_url)))
            .query(&[("path", path)])
            .send()
            .await?;
        Ok(Self::ensure_ok(resp).await?.json().await?)
    }

    pub async fn download(&self, id: i64) -> Result<Vec<u8>, ApiError> {
        let resp = self
            .authed(self.client.get(format!("{}/file/{}", self.base_url, id)))
            .send()
            .await?;
        Ok(Self::ensure_ok(resp).await?.bytes().await?.to_vec())
    }

    pub async fn upload(&self, form: reqwest::multipart::Form) -> Result<(), ApiError> {
        let resp = self
            .authed(self.client.post(format!("{}/file/", self.base_url)))
            .multipart(form)
            .send()
            .await?;
        Self::ensure_ok(resp).await?;
        Ok(())
    }

    pub async fn delete_file(&self, id: i64) -> Result<(), ApiError> {
        let resp = self
            .authed(self.client.delete(format!("{}/file/{}", self.base_url, id)))
            .send()
            .await?;
        Self::ensure_ok(resp).await?;
        Ok(())
    }

    pub async fn delete_folder(&self, path: &str) -> Result<(), ApiError> {
        let resp = self
            .authed(self.client.delete(format!("{}/folder", self.base_url)))
            .query(&[("path", path)])
            .send()
            .await?;
        Self::ensure_ok(resp).await?;
        Ok(())
    }
}

/// Pull a human-readable message out of an error body. The server answers
/// with `{"fail": ...}`, `{"error": ...}` or `{"message": ...}` depending on
/// the endpoint; fall back to the raw body, then the status phrase.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["fail", "error", "message"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_deserializes_listing() {
        let json = r#"[
            {
                "id": 12,
                "type": "filename",
                "name": "report.pdf",
                "fullpath": "/docs/report.pdf",
                "upload_date": "2024-06-01T10:30:00Z",
                "filetype": "application/pdf",
                "filesize": 52000,
                "description": "quarterly report",
                "tags": ["work", "q2"],
                "md5": "d41d8cd98f00b204e9800998ecf8427e"
            },
            {
                "id": 3,
                "type": "folder",
                "name": "photos/",
                "fullpath": "/photos/",
                "upload_date": "2024-05-20T08:00:00Z"
            }
        ]"#;

        let entries: Vec<Entry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 2);

        let file = &entries[0];
        assert_eq!(file.kind, EntryKind::File);
        assert_eq!(file.id, 12);
        assert_eq!(file.full_path, "/docs/report.pdf");
        assert_eq!(file.size, 52000);
        assert_eq!(file.tags, vec!["work", "q2"]);
        assert_eq!(file.md5.as_deref(), Some("d41d8cd98f00b204e9800998ecf8427e"));

        let folder = &entries[1];
        assert_eq!(folder.kind, EntryKind::Folder);
        assert_eq!(folder.size, 0);
        assert!(folder.tags.is_empty());
        assert!(folder.description.is_none());
    }

    #[test]
    fn test_entry_kind_accepts_both_file_spellings() {
        let modern: EntryKind = serde_json::from_str(r#""file""#).unwrap();
        let legacy: EntryKind = serde_json::from_str(r#""filename""#).unwrap();
        assert_eq!(modern, EntryKind::File);
        assert_eq!(legacy, EntryKind::File);
    }

    #[test]
    fn test_entry_digest_alias() {
        let json = r#"{
            "id": 1, "type": "file", "name": "a", "fullpath": "/a",
            "upload_date": "", "filesize": 10, "sha2": "abc123"
        }"#;
        let entry: Entry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.md5.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_error_message_extraction() {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        assert_eq!(
            error_message(status, r#"{"fail": "this filename already exists in folder"}"#),
            "this filename already exists in folder"
        );
        assert_eq!(error_message(status, r#"{"error": "bad path"}"#), "bad path");
        assert_eq!(error_message(status, "plain text"), "plain text");
        assert_eq!(error_message(status, ""), "Internal Server Error");
    }

    #[test]
    fn test_status_class_helpers() {
        let unauthorized = ApiError::Status {
            status: StatusCode::UNAUTHORIZED,
            message: "nope".to_string(),
        };
        assert!(unauthorized.is_unauthorized());
        assert!(!unauthorized.is_conflict());

        let conflict = ApiError::Status {
            status: StatusCode::CONFLICT,
            message: "exists".to_string(),
        };
        assert!(conflict.is_conflict());
    }
}
