use ratatui::style::Color;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    #[serde(rename = "theme-pink")]
    Pink,
    #[serde(rename = "theme-blue")]
    Blue,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Pink => Theme::Blue,
            Theme::Blue => Theme::Pink,
        }
    }

    /// State of the pink/blue switch: checked means blue.
    pub fn is_checked(self) -> bool {
        self == Theme::Blue
    }

    pub fn title(self) -> &'static str {
        match self {
            Theme::Pink => "Downloader Glitter-Pink 💖",
            Theme::Blue => "Cyber Blue Downloader 🤖",
        }
    }

    pub fn accent(self) -> Color {
        match self {
            Theme::Pink => Color::LightMagenta,
            Theme::Blue => Color::Cyan,
        }
    }

    pub fn highlight(self) -> Color {
        match self {
            Theme::Pink => Color::Magenta,
            Theme::Blue => Color::Blue,
        }
    }
}

/// What the metadata lookup returned for a link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preview {
    pub title: String,
    pub thumbnail_url: String,
    pub canonical_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// URL and title carried from the preview step to the download step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HiddenFields {
    pub url: String,
    pub title: String,
}

impl HiddenFields {
    pub fn is_complete(&self) -> bool {
        !self.url.is_empty() && !self.title.is_empty()
    }

    pub fn clear(&mut self) {
        self.url.clear();
        self.title.clear();
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DownloadProgress {
    pub bytes_downloaded: u64,
    pub total_size: Option<u64>,
}

impl DownloadProgress {
    pub fn percent(&self) -> Option<u16> {
        match self.total_size {
            Some(0) | None => None,
            Some(total) => Some(((self.bytes_downloaded.min(total) * 100) / total) as u16),
        }
    }
}
