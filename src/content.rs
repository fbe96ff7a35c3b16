//! Activity lookup and file download bookkeeping
//!
//! The lookup and download services live outside the crate. Requests go out as
//! tickets (see `SessionEvent`), and the host hands results back with the same
//! ticket. Results for stale tickets, or anything arriving after the panel is
//! closed, are dropped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::consts::{DOWNLOAD_ERROR_MS, LOOKUP_LIMIT};

/// Lookup/download failures
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("activity lookup failed: {0}")]
    Lookup(String),
    #[error("file download failed: {0}")]
    Download(String),
    #[error("download of file '{file_id}' was not successful")]
    Unsuccessful { file_id: String },
    #[error("malformed response: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Activity lookup request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupQuery {
    pub label: String,
    pub include_private: bool,
    pub limit: u32,
}

impl LookupQuery {
    /// Public activities for a phoneme label
    pub fn for_label(label: &str) -> Self {
        Self {
            label: label.to_string(),
            include_private: false,
            limit: LOOKUP_LIMIT,
        }
    }
}

/// Downloadable file attached to an activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One learning activity returned by the lookup service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub files: Vec<FileRef>,
}

/// Download service response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    pub success: bool,
    #[serde(default)]
    pub url: Option<String>,
}

/// Parse a lookup response body (JSON array of activities)
pub fn parse_activities(json: &str) -> Result<Vec<ActivityRecord>, ContentError> {
    Ok(serde_json::from_str(json)?)
}

/// Parse a download response body
pub fn parse_download(json: &str) -> Result<DownloadLink, ContentError> {
    Ok(serde_json::from_str(json)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LookupTicket(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DownloadTicket(pub u64);

/// What the detail view should show
#[derive(Debug, Clone, PartialEq)]
pub enum PanelView<'a> {
    /// Nothing popped yet
    Idle,
    Loading { label: &'a str },
    /// Lookup finished (or failed) with nothing to show
    Empty { label: &'a str },
    Activities {
        label: &'a str,
        records: &'a [ActivityRecord],
    },
}

/// Content state behind the detail view
#[derive(Debug, Default)]
pub struct ContentPanel {
    next_ticket: u64,
    label: Option<String>,
    pending_lookup: Option<LookupTicket>,
    activities: Vec<ActivityRecord>,
    pending_downloads: HashMap<DownloadTicket, String>,
    /// file id -> time (ms) the error badge expires
    download_errors: HashMap<String, f64>,
    closed: bool,
}

impl ContentPanel {
    pub fn new() -> Self {
        Self::default()
    }

    fn ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    /// Start a lookup; the previous one (if any) becomes stale
    pub fn begin_lookup(&mut self, query: &LookupQuery) -> Option<LookupTicket> {
        if self.closed {
            return None;
        }
        let ticket = LookupTicket(self.ticket());
        self.label = Some(query.label.clone());
        self.pending_lookup = Some(ticket);
        self.activities.clear();
        Some(ticket)
    }

    /// Deliver a lookup result; returns false if it was stale and ignored
    pub fn resolve_lookup(
        &mut self,
        ticket: LookupTicket,
        result: Result<Vec<ActivityRecord>, ContentError>,
    ) -> bool {
        if self.closed || self.pending_lookup != Some(ticket) {
            log::debug!("Discarding stale lookup result {:?}", ticket);
            return false;
        }
        self.pending_lookup = None;
        match result {
            Ok(records) => {
                log::info!(
                    "Loaded {} activities for '{}'",
                    records.len(),
                    self.label.as_deref().unwrap_or_default()
                );
                self.activities = records;
            }
            Err(e) => {
                log::warn!("{}", e);
                self.activities.clear();
            }
        }
        true
    }

    pub fn is_loading(&self) -> bool {
        self.pending_lookup.is_some()
    }

    pub fn activities(&self) -> &[ActivityRecord] {
        &self.activities
    }

    pub fn view(&self) -> PanelView<'_> {
        match (&self.label, self.is_loading()) {
            (None, _) => PanelView::Idle,
            (Some(label), true) => PanelView::Loading { label },
            (Some(label), false) if self.activities.is_empty() => PanelView::Empty { label },
            (Some(label), false) => PanelView::Activities {
                label,
                records: &self.activities,
            },
        }
    }

    /// Start a download for `file_id`
    pub fn begin_download(&mut self, file_id: &str) -> Option<DownloadTicket> {
        if self.closed {
            return None;
        }
        let ticket = DownloadTicket(self.ticket());
        self.download_errors.remove(file_id);
        self.pending_downloads.insert(ticket, file_id.to_string());
        Some(ticket)
    }

    /// Deliver a download result; returns the URL to open on success
    pub fn resolve_download(
        &mut self,
        ticket: DownloadTicket,
        result: Result<DownloadLink, ContentError>,
        now_ms: f64,
    ) -> Option<String> {
        if self.closed {
            return None;
        }
        let file_id = self.pending_downloads.remove(&ticket)?;
        let outcome = result.and_then(|link| match (link.success, link.url) {
            (true, Some(url)) => Ok(url),
            _ => Err(ContentError::Unsuccessful {
                file_id: file_id.clone(),
            }),
        });
        match outcome {
            Ok(url) => Some(url),
            Err(e) => {
                log::warn!("{}", e);
                self.download_errors
                    .insert(file_id, now_ms + DOWNLOAD_ERROR_MS);
                None
            }
        }
    }

    /// Whether `file_id` shows its error badge at `now_ms`
    pub fn has_download_error(&self, file_id: &str, now_ms: f64) -> bool {
        self.download_errors
            .get(file_id)
            .is_some_and(|&until| now_ms < until)
    }

    pub fn is_downloading(&self, file_id: &str) -> bool {
        self.pending_downloads.values().any(|id| id == file_id)
    }

    /// Drop expired error badges
    pub fn clear_expired(&mut self, now_ms: f64) {
        self.download_errors.retain(|_, until| now_ms < *until);
    }

    /// Stop accepting results (teardown)
    pub fn close(&mut self) {
        self.closed = true;
        self.pending_lookup = None;
        self.pending_downloads.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
