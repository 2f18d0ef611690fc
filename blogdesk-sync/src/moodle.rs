//! Moodle web-service gateway.
//!
//! Talks to the REST endpoint (`/webservice/rest/server.php`) for entry
//! operations and to `/webservice/upload.php` for draft file uploads.
//! Moodle reports exceptions with HTTP 200 and an `exception`/`errorcode`
//! body; those become [`SyncError::Rejected`].

use crate::error::{SyncError, SyncResult};
use crate::gateway::{BlogGateway, EntryDraft};
use crate::local_files::LocalFileStore;
use async_trait::async_trait;
use blogdesk_types::{
    AreaId, AttachmentsRef, BlogPost, EntryFilter, EntryId, EntryOption, FileEntry, RemoteFile,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings for a Moodle site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodleConfig {
    /// Site root, e.g. `https://school.example`.
    pub site_url: String,
    /// Web-service token of the user.
    pub token: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for MoodleConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost".to_string(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AddEntryResponse {
    entryid: i64,
}

#[derive(Debug, Deserialize)]
struct UpdateEntryResponse {
    status: bool,
}

#[derive(Debug, Deserialize)]
struct GetEntriesResponse {
    entries: Vec<BlogPost>,
}

#[derive(Debug, Deserialize)]
struct PrepareEntryResponse {
    attachmentsid: i64,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    itemid: i64,
}

type Params = Vec<(String, String)>;

/// [`BlogGateway`] backed by a Moodle site.
pub struct MoodleGateway {
    config: MoodleConfig,
    client: Client,
    files: LocalFileStore,
}

impl MoodleGateway {
    pub fn new(config: MoodleConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            files: LocalFileStore::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.site_url.trim_end_matches('/'), path)
    }

    async fn call<T: DeserializeOwned>(&self, function: &str, params: Params) -> SyncResult<T> {
        let mut form: Params = vec![
            ("wstoken".to_string(), self.config.token.clone()),
            ("wsfunction".to_string(), function.to_string()),
            ("moodlewsrestformat".to_string(), "json".to_string()),
        ];
        form.extend(params);

        debug!("Calling web service {}", function);
        let response = self
            .client
            .post(self.url("/webservice/rest/server.php"))
            .form(&form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        check_status(function, status)?;

        let value: serde_json::Value = serde_json::from_str(&body)?;
        if let Some(error) = ws_exception(&value) {
            return Err(error);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Turns the draft's attachment reference into an area id, uploading
    /// locally staged files first.
    async fn resolve_area(&self, draft: &EntryDraft) -> SyncResult<Option<AreaId>> {
        match &draft.attachments {
            None => Ok(None),
            Some(AttachmentsRef::Staged(area)) => Ok(Some(*area)),
            Some(AttachmentsRef::Local(stored)) => {
                let files = self.files.resolve(stored).await?;
                if files.is_empty() {
                    return Ok(None);
                }
                Ok(Some(self.upload_files(None, &files).await?))
            }
        }
    }

    fn entry_params(draft: &EntryDraft, area: Option<AreaId>) -> Params {
        let mut params: Params = vec![
            ("subject".to_string(), draft.subject.clone()),
            ("summary".to_string(), draft.summary.clone()),
            ("summaryformat".to_string(), draft.summary_format.to_string()),
        ];

        let mut options = draft.options();
        if let Some(area) = area.filter(|a| a.get() > 0) {
            options.push(EntryOption::new("attachmentsid", area));
        }
        for (i, option) in options.into_iter().enumerate() {
            params.push((format!("options[{i}][name]"), option.name));
            params.push((format!("options[{i}][value]"), option.value));
        }
        params
    }

    async fn download(&self, file: &RemoteFile) -> SyncResult<Vec<u8>> {
        let separator = if file.fileurl.contains('?') { '&' } else { '?' };
        let url = format!("{}{}token={}", file.fileurl, separator, self.config.token);

        debug!("Downloading {} for re-upload", file.filename);
        let response = self.client.get(url).send().await?;
        check_status(&file.filename, response.status())?;
        Ok(response.bytes().await?.to_vec())
    }
}

fn check_status(what: &str, status: StatusCode) -> SyncResult<()> {
    if status.is_success() {
        return Ok(());
    }
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        return Err(SyncError::Network(format!("{what} returned HTTP {status}")));
    }
    Err(SyncError::Rejected {
        errorcode: format!("http{}", status.as_u16()),
        message: None,
    })
}

/// Extracts a web-service exception from a response body, if it is one.
fn ws_exception(value: &serde_json::Value) -> Option<SyncError> {
    let object = value.as_object()?;
    if !object.contains_key("exception") && !object.contains_key("errorcode") {
        return None;
    }
    let errorcode = object
        .get("errorcode")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let message = object
        .get("message")
        .or_else(|| object.get("error"))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    Some(SyncError::Rejected { errorcode, message })
}

#[async_trait]
impl BlogGateway for MoodleGateway {
    /// The server stamps its own creation time; `created` only matters for
    /// offline drafts.
    async fn create(&self, draft: &EntryDraft, _created: i64) -> SyncResult<EntryId> {
        let area = self.resolve_area(draft).await?;
        let params = Self::entry_params(draft, area);
        let response: AddEntryResponse = self.call("core_blog_add_entry", params).await?;
        info!("Created blog entry {}", response.entryid);
        Ok(EntryId::new(response.entryid))
    }

    async fn update(&self, id: EntryId, draft: &EntryDraft) -> SyncResult<()> {
        let area = self.resolve_area(draft).await?;
        let mut params = vec![("entryid".to_string(), id.to_string())];
        params.extend(Self::entry_params(draft, area));

        let response: UpdateEntryResponse = self.call("core_blog_update_entry", params).await?;
        if !response.status {
            return Err(SyncError::rejected(
                "updateentryfailed",
                "The entry could not be updated.",
            ));
        }
        info!("Updated blog entry {}", id);
        Ok(())
    }

    async fn fetch_by_filter(&self, filter: &EntryFilter) -> SyncResult<Vec<BlogPost>> {
        let mut params = Params::new();
        for (i, (name, value)) in filter.to_pairs().into_iter().enumerate() {
            params.push((format!("filters[{i}][name]"), name.to_string()));
            params.push((format!("filters[{i}][value]"), value));
        }
        let response: GetEntriesResponse = self.call("core_blog_get_entries", params).await?;
        Ok(response.entries)
    }

    async fn fetch_by_id(&self, id: EntryId) -> SyncResult<Vec<BlogPost>> {
        self.fetch_by_filter(&EntryFilter::for_entry(id)).await
    }

    async fn prepare_staging_area(&self, id: EntryId) -> SyncResult<AreaId> {
        let params = vec![("entryid".to_string(), id.to_string())];
        let response: PrepareEntryResponse = self
            .call("core_blog_prepare_entry_for_edition", params)
            .await?;
        Ok(AreaId::new(response.attachmentsid))
    }

    /// Into an existing area only local files are sent. A new area also
    /// receives copies of remote files, downloaded and uploaded again.
    async fn upload_files(&self, area: Option<AreaId>, files: &[FileEntry]) -> SyncResult<AreaId> {
        let mut form = Form::new()
            .text("token", self.config.token.clone())
            .text("filearea", "draft")
            .text("itemid", area.map_or(0, |a| a.get()).to_string());

        let mut count = 0;
        for file in files {
            let bytes = match file {
                FileEntry::Local { path, .. } => tokio::fs::read(path).await?,
                FileEntry::Remote(remote) if area.is_none() => self.download(remote).await?,
                FileEntry::Remote(_) => continue,
            };
            count += 1;
            let part = Part::bytes(bytes).file_name(file.filename().to_string());
            form = form.part(format!("file_{count}"), part);
        }

        if count == 0 {
            return Ok(area.unwrap_or(AreaId::new(0)));
        }

        debug!("Uploading {} file(s) to draft area {:?}", count, area);
        let response = self
            .client
            .post(self.url("/webservice/upload.php"))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        check_status("upload", status)?;

        let value: serde_json::Value = serde_json::from_str(&body)?;
        if let Some(error) = ws_exception(&value) {
            return Err(error);
        }
        let uploaded: Vec<UploadedFile> = serde_json::from_value(value)?;
        let itemid = uploaded
            .first()
            .map(|f| f.itemid)
            .ok_or_else(|| SyncError::NotFound("upload returned no files".to_string()))?;
        Ok(AreaId::new(itemid))
    }

    async fn delete_files(&self, area: AreaId, files: &[FileEntry]) -> SyncResult<()> {
        let mut params = vec![("draftitemid".to_string(), area.to_string())];
        for (i, file) in files.iter().enumerate() {
            let filepath = match file {
                FileEntry::Remote(remote) => remote.filepath.clone(),
                FileEntry::Local { .. } => "/".to_string(),
            };
            params.push((format!("files[{i}][filepath]"), filepath));
            params.push((format!("files[{i}][filename]"), file.filename().to_string()));
        }
        let _: serde_json::Value = self.call("core_files_delete_draft_files", params).await?;
        debug!("Deleted {} file(s) from draft area {}", files.len(), area);
        Ok(())
    }
}
