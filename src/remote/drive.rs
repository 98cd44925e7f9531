//! Google Drive v3 remote store.
//!
//! Folders are Drive files with the folder mime type; everything else is
//! treated as a file. Content is transferred with resumable upload sessions
//! so large files are streamed from disk rather than buffered.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{CONTENT_LENGTH, LOCATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use super::RemoteStore;
use crate::error::{Error, Result};
use crate::local::LocalFs;
use crate::model::{RemoteEntry, RemoteKind, RemoteRef, UploadMetadata};

/// Base URL for metadata requests.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Base URL for content uploads.
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Mime type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

const ENTRY_FIELDS: &str = "id,name,parents,modifiedTime,mimeType,size";
const LIST_FIELDS: &str = "nextPageToken,files(id,name,parents,modifiedTime,mimeType,size)";
const REF_FIELDS: &str = "id,name";
const PAGE_SIZE: &str = "1000";

/// Drive API client authenticated with a bearer access token.
pub struct DriveClient {
    client: reqwest::Client,
    api_base: String,
    upload_base: String,
    token: String,
}

impl DriveClient {
    /// Create a client against the public Drive endpoints.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_endpoints(token, DRIVE_API_BASE, DRIVE_UPLOAD_BASE)
    }

    /// Create a client against custom endpoints (proxies, test servers).
    pub fn with_endpoints(
        token: impl Into<String>,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            upload_base: upload_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url).bearer_auth(&self.token)
    }

    /// Open a resumable upload session and return its URL.
    async fn open_upload_session(
        &self,
        method: Method,
        url: &str,
        metadata: serde_json::Value,
        size: u64,
    ) -> Result<String> {
        let response = self
            .request(method, url)
            .query(&[("uploadType", "resumable"), ("fields", REF_FIELDS)])
            .header("X-Upload-Content-Length", size)
            .json(&metadata)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| Error::Remote {
                status: response.status().as_u16(),
                message: "upload session response carried no Location header".to_string(),
            })
    }

    /// Stream a local file into an open upload session.
    async fn send_content(&self, session_url: &str, local_path: &Path, size: u64) -> Result<RemoteRef> {
        let file = LocalFs.open_read(local_path).await?;
        let response = self
            .request(Method::PUT, session_url)
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::from(file))
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }
}

impl RemoteStore for DriveClient {
    async fn list_children(&self, container_id: &str) -> Result<Vec<RemoteEntry>> {
        let url = format!("{}/files", self.api_base);
        let query = format!("'{}' in parents and trashed = false", escape_query(container_id));
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.request(Method::GET, &url).query(&[
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: FileList = ensure_success(request.send().await?).await?.json().await?;
            entries.extend(page.files.into_iter().map(RemoteEntry::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        trace!(container_id, count = entries.len(), "Listed remote container");
        Ok(entries)
    }

    async fn get_metadata(&self, id: &str) -> Result<RemoteEntry> {
        let url = format!("{}/files/{id}", self.api_base);
        let response = self
            .request(Method::GET, &url)
            .query(&[("fields", ENTRY_FIELDS)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::RemoteNotFound { id: id.to_string() });
        }

        let file: DriveFile = ensure_success(response).await?.json().await?;
        Ok(file.into())
    }

    async fn create_container(
        &self,
        name: &str,
        parent_id: &str,
        modified_time: DateTime<Utc>,
    ) -> Result<RemoteRef> {
        let url = format!("{}/files", self.api_base);
        let metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent_id],
            "modifiedTime": drive_time(modified_time),
        });

        let response = self
            .request(Method::POST, &url)
            .query(&[("fields", REF_FIELDS)])
            .json(&metadata)
            .send()
            .await?;

        let created: RemoteRef = ensure_success(response).await?.json().await?;
        debug!(name, parent_id, id = %created.id, "Created remote folder");
        Ok(created)
    }

    async fn upload_new(
        &self,
        local_path: &Path,
        parent_id: &str,
        metadata: &UploadMetadata,
    ) -> Result<RemoteRef> {
        let size = tokio::fs::metadata(local_path).await?.len();
        let url = format!("{}/files", self.upload_base);
        let body = serde_json::json!({
            "name": metadata.name,
            "parents": [parent_id],
            "modifiedTime": drive_time(metadata.modified_time),
        });

        let session = self.open_upload_session(Method::POST, &url, body, size).await?;
        self.send_content(&session, local_path, size).await
    }

    async fn replace_content(
        &self,
        id: &str,
        metadata: &UploadMetadata,
        local_path: &Path,
    ) -> Result<RemoteRef> {
        let size = tokio::fs::metadata(local_path).await?.len();
        let url = format!("{}/files/{id}", self.upload_base);
        let body = serde_json::json!({
            "modifiedTime": drive_time(metadata.modified_time),
        });

        let session = self.open_upload_session(Method::PATCH, &url, body, size).await?;
        self.send_content(&session, local_path, size).await
    }

    async fn download_content<W>(&self, id: &str, sink: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let url = format!("{}/files/{id}", self.api_base);
        let response = self
            .request(Method::GET, &url)
            .query(&[("alt", "media")])
            .send()
            .await?;
        let mut response = ensure_success(response).await?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            sink.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        sink.flush().await?;

        Ok(written)
    }
}

/// Drive file resource, restricted to the fields we request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    #[serde(default)]
    parents: Vec<String>,
    modified_time: DateTime<Utc>,
    mime_type: String,
    /// int64 encoded as a decimal string; absent for folders and native docs.
    #[serde(default)]
    size: Option<String>,
}

impl From<DriveFile> for RemoteEntry {
    fn from(file: DriveFile) -> Self {
        let kind = if file.mime_type == FOLDER_MIME_TYPE {
            RemoteKind::Container
        } else {
            RemoteKind::File
        };

        Self {
            id: file.id,
            name: file.name,
            parent_ids: file.parents,
            modified_time: file.modified_time,
            size: file.size.and_then(|s| s.parse().ok()).unwrap_or(0),
            kind,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(Error::Remote {
        status: status.as_u16(),
        message,
    })
}

fn drive_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Escape a value for use inside a single-quoted Drive query literal.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> DriveClient {
        DriveClient::with_endpoints(
            "test-token",
            format!("{}/drive/v3", server.uri()),
            format!("{}/upload/drive/v3", server.uri()),
        )
    }

    #[test]
    fn test_escape_query() {
        assert_eq!(escape_query("abc"), "abc");
        assert_eq!(escape_query("a'b"), "a\\'b");
        assert_eq!(escape_query("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_drive_time_uses_millis() {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(drive_time(t), "2024-01-02T03:04:05.000Z");
    }

    #[tokio::test]
    async fn test_list_children_follows_pages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [{
                    "id": "f2",
                    "name": "sub",
                    "parents": ["root"],
                    "modifiedTime": "2024-03-01T10:00:00.000Z",
                    "mimeType": FOLDER_MIME_TYPE
                }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .and(query_param("q", "'root' in parents and trashed = false"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "nextPageToken": "p2",
                "files": [{
                    "id": "f1",
                    "name": "a.txt",
                    "parents": ["root"],
                    "modifiedTime": "2024-03-01T10:00:00.000Z",
                    "mimeType": "text/plain",
                    "size": "100"
                }]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let entries = client_for(&server).list_children("root").await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].size, 100);
        assert!(entries[0].is_file());
        assert_eq!(entries[1].name, "sub");
        assert_eq!(entries[1].size, 0);
        assert!(entries[1].is_container());
    }

    #[tokio::test]
    async fn test_get_metadata_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server).get_metadata("missing").await.unwrap_err();
        assert!(matches!(err, Error::RemoteNotFound { id } if id == "missing"));
    }

    #[tokio::test]
    async fn test_create_container_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/drive/v3/files"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_container("docs", "root", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Remote { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_upload_new_uses_resumable_session() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("b.txt");
        std::fs::write(&file, b"hello").unwrap();

        Mock::given(method("POST"))
            .and(path("/upload/drive/v3/files"))
            .and(query_param("uploadType", "resumable"))
            .and(header("X-Upload-Content-Length", "5"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Location", format!("{}/session/1", server.uri()).as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/session/1"))
            .and(body_string("hello"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "new1", "name": "b.txt"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let metadata = UploadMetadata {
            name: "b.txt".into(),
            modified_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let created = client_for(&server)
            .upload_new(&file, "root", &metadata)
            .await
            .unwrap();

        assert_eq!(created.id, "new1");
        assert_eq!(created.name, "b.txt");
    }

    #[tokio::test]
    async fn test_download_streams_into_sink() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files/f1"))
            .and(query_param("alt", "media"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"remote content".to_vec()))
            .mount(&server)
            .await;

        let mut sink = Vec::new();
        let written = client_for(&server)
            .download_content("f1", &mut sink)
            .await
            .unwrap();

        assert_eq!(written, 14);
        assert_eq!(sink, b"remote content");
    }
}
