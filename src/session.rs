//! The link → preview → download state machine.
//!
//! `Session` is plain data. `Session::update` is the only place where it
//! changes, and it never touches the network, the filesystem or the clock:
//! it hands back a list of [`Effect`]s for the `App` to carry out, and the
//! outcome of each effect comes back later as another [`SessionEvent`].

use crate::error::AppError;
use crate::models::{DownloadProgress, HiddenFields, Preview, StatusMessage};
use tracing::debug;

const SEARCHING_TEXT: &str = "Fetching video data... (hang on a moment!)";
const PREVIEW_LOADED_TEXT: &str = "Preview loaded! Press Enter or Ctrl+D to download the MP3.";
const DOWNLOADING_TEXT: &str =
    "Processing and converting to MP3 on the server... (this can take a few seconds)";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// No request in flight and no preview on screen.
    #[default]
    Idle,
    /// Metadata request in flight.
    Searching,
    /// Preview on screen.
    Previewed,
    /// Download request in flight.
    Downloading,
    /// Download delivered, waiting for the automatic reset.
    Saved,
}

impl Phase {
    pub fn is_busy(self) -> bool {
        matches!(self, Phase::Searching | Phase::Downloading)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEdit {
    Insert(char),
    Backspace,
    Clear,
    Paste(String),
}

#[derive(Debug)]
pub enum SessionEvent {
    Edit(LinkEdit),
    SubmitLink,
    MetadataLoaded(Preview),
    MetadataFailed(AppError),
    SubmitDownload,
    DownloadProgress(DownloadProgress),
    DownloadSaved { filename: String },
    DownloadFailed(AppError),
    ResetElapsed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    FetchMetadata { link: String },
    Download { url: String, title: String },
    ScheduleReset,
    CancelReset,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub phase: Phase,
    pub link: String,
    pub hidden: HiddenFields,
    /// `None` while the preview panel is hidden.
    pub preview: Option<Preview>,
    pub status: Option<StatusMessage>,
    pub download_enabled: bool,
    pub search_visible: bool,
    pub search_enabled: bool,
    pub progress: Option<DownloadProgress>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            link: String::new(),
            hidden: HiddenFields::default(),
            preview: None,
            status: None,
            download_enabled: false,
            search_visible: true,
            search_enabled: true,
            progress: None,
        }
    }

    /// Whether the search control can be used right now.
    pub fn can_search(&self) -> bool {
        self.search_visible && self.search_enabled && !self.phase.is_busy()
    }

    /// Whether the download control can be used right now.
    pub fn can_download(&self) -> bool {
        self.preview.is_some() && self.download_enabled && !self.phase.is_busy()
    }

    pub fn update(&mut self, event: SessionEvent) -> Vec<Effect> {
        debug!(phase = ?self.phase, ?event, "session event");
        match event {
            SessionEvent::Edit(edit) => {
                if self.apply_edit(edit) {
                    self.collapse_view();
                }
                Vec::new()
            }
            SessionEvent::SubmitLink => {
                if !self.can_search() {
                    return Vec::new();
                }
                let mut effects = vec![Effect::CancelReset];
                match self.submit_link() {
                    Ok(effect) => effects.push(effect),
                    Err(err) => self.status = Some(StatusMessage::error(err.to_string())),
                }
                effects
            }
            SessionEvent::MetadataLoaded(preview) => {
                if self.phase != Phase::Searching {
                    return Vec::new();
                }
                self.hidden = HiddenFields {
                    url: preview.canonical_url.clone(),
                    title: preview.title.clone(),
                };
                self.preview = Some(preview);
                self.search_visible = false;
                self.search_enabled = true;
                self.status = Some(StatusMessage::info(PREVIEW_LOADED_TEXT));
                self.phase = Phase::Previewed;
                self.download_enabled = true;
                Vec::new()
            }
            SessionEvent::MetadataFailed(err) => {
                if self.phase != Phase::Searching {
                    return Vec::new();
                }
                self.status = Some(StatusMessage::error(metadata_failure_text(&err)));
                self.search_visible = true;
                self.search_enabled = true;
                self.phase = Phase::Idle;
                Vec::new()
            }
            SessionEvent::SubmitDownload => match self.submit_download() {
                Ok(effects) => effects,
                Err(err) => {
                    self.status = Some(StatusMessage::error(err.to_string()));
                    self.download_enabled = false;
                    Vec::new()
                }
            },
            SessionEvent::DownloadProgress(progress) => {
                if self.phase == Phase::Downloading {
                    self.progress = Some(progress);
                }
                Vec::new()
            }
            SessionEvent::DownloadSaved { filename } => {
                if self.phase != Phase::Downloading {
                    return Vec::new();
                }
                self.status = Some(StatusMessage::info(format!(
                    "Download of \"{}\" finished successfully!",
                    filename
                )));
                self.download_enabled = false;
                self.phase = Phase::Saved;
                vec![Effect::ScheduleReset]
            }
            SessionEvent::DownloadFailed(err) => {
                if self.phase != Phase::Downloading {
                    return Vec::new();
                }
                self.status = Some(StatusMessage::error(download_failure_text(&err)));
                self.progress = None;
                // The download control is not re-enabled here; only a new
                // search brings it back.
                self.phase = if self.preview.is_some() {
                    Phase::Previewed
                } else {
                    Phase::Idle
                };
                Vec::new()
            }
            SessionEvent::ResetElapsed => {
                self.reset();
                Vec::new()
            }
        }
    }

    fn submit_link(&mut self) -> Result<Effect, AppError> {
        let link = self.link.trim();
        if link.is_empty() {
            return Err(AppError::Validation);
        }
        let link = link.to_string();

        self.preview = None;
        self.progress = None;
        self.download_enabled = false;
        self.search_visible = true;
        self.search_enabled = false;
        self.status = Some(StatusMessage::info(SEARCHING_TEXT));
        self.phase = Phase::Searching;
        Ok(Effect::FetchMetadata { link })
    }

    fn submit_download(&mut self) -> Result<Vec<Effect>, AppError> {
        if !self.hidden.is_complete() {
            return Err(AppError::Precondition);
        }
        if !self.can_download() {
            return Ok(Vec::new());
        }

        self.status = Some(StatusMessage::info(DOWNLOADING_TEXT));
        self.download_enabled = false;
        self.progress = Some(DownloadProgress::default());
        self.phase = Phase::Downloading;
        Ok(vec![Effect::Download {
            url: self.hidden.url.clone(),
            title: self.hidden.title.clone(),
        }])
    }

    /// Returns true when the link text actually changed.
    fn apply_edit(&mut self, edit: LinkEdit) -> bool {
        match edit {
            LinkEdit::Insert(c) => {
                self.link.push(c);
                true
            }
            LinkEdit::Backspace => self.link.pop().is_some(),
            LinkEdit::Clear => {
                let changed = !self.link.is_empty();
                self.link.clear();
                changed
            }
            LinkEdit::Paste(text) => {
                let sanitized = text.replace(['\n', '\r'], "");
                self.link.push_str(&sanitized);
                !sanitized.is_empty()
            }
        }
    }

    /// Back to the look of `Idle` without touching the typed link or the
    /// hidden fields.
    fn collapse_view(&mut self) {
        self.preview = None;
        self.status = None;
        self.search_visible = true;
        if !self.phase.is_busy() {
            self.search_enabled = true;
            self.progress = None;
            self.phase = Phase::Idle;
        }
    }

    fn reset(&mut self) {
        self.link.clear();
        self.hidden.clear();
        self.preview = None;
        self.progress = None;
        self.search_visible = true;
        self.search_enabled = true;
        self.status = None;
        self.phase = Phase::Idle;
    }
}

fn metadata_failure_text(err: &AppError) -> String {
    match err {
        AppError::Service(Some(msg)) => format!("Error: {}", msg),
        AppError::Service(None) => String::from("Error: Invalid link or server problem."),
        other => format!(
            "Connection error. Check that the server is running. Error: {}",
            other
        ),
    }
}

fn download_failure_text(err: &AppError) -> String {
    match err {
        AppError::Service(Some(msg)) => format!("Download error: {}", msg),
        AppError::Service(None) => String::from("Download error: Unknown problem on the server."),
        other => format!("Network error or conversion failure: {}", other),
    }
}
