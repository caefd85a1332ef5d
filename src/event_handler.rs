use crate::app::App;
use crate::models::DownloadProgress;
use crate::network::TaskResponse;
use crate::session::{LinkEdit, SessionEvent};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io::Result;
use tracing::{debug, warn};

/// Returns `Ok(true)` when the user asked to quit.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Windows reports releases too
    if key.kind == KeyEventKind::Release {
        return Ok(false);
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => return Ok(true),
        KeyCode::Char('c') if ctrl => return Ok(true),

        // THEME SWITCH
        KeyCode::Char('t') if ctrl => app.toggle_theme(),

        // DOWNLOAD
        KeyCode::Char('d') if ctrl => app.dispatch(SessionEvent::SubmitDownload),

        // CLEAR LINE (Standard Terminal Shortcut)
        KeyCode::Char('u') if ctrl => app.dispatch(SessionEvent::Edit(LinkEdit::Clear)),

        // PASTE (Standard Shortcut)
        KeyCode::Char('v') if ctrl => match read_clipboard() {
            Ok(text) => app.dispatch(SessionEvent::Edit(LinkEdit::Paste(text))),
            Err(e) => warn!("clipboard unavailable: {}", e),
        },

        KeyCode::Enter => {
            if app.session.can_download() {
                app.dispatch(SessionEvent::SubmitDownload);
            } else {
                app.dispatch(SessionEvent::SubmitLink);
            }
        }
        KeyCode::Backspace => app.dispatch(SessionEvent::Edit(LinkEdit::Backspace)),
        KeyCode::Char(c) if !ctrl => app.dispatch(SessionEvent::Edit(LinkEdit::Insert(c))),
        _ => {}
    }
    Ok(false)
}

fn read_clipboard() -> std::result::Result<String, arboard::Error> {
    arboard::Clipboard::new()?.get_text()
}

pub fn handle_task_response(app: &mut App, response: TaskResponse) {
    let event = match response {
        TaskResponse::MetadataLoaded(preview) => SessionEvent::MetadataLoaded(preview),
        TaskResponse::MetadataFailed(e) => SessionEvent::MetadataFailed(e),
        TaskResponse::DownloadProgress(bytes_downloaded, total_size) => {
            SessionEvent::DownloadProgress(DownloadProgress {
                bytes_downloaded,
                total_size,
            })
        }
        TaskResponse::DownloadSaved(filename, path) => {
            // Name on disk, which may differ after sanitizing or numbering
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or(filename);
            SessionEvent::DownloadSaved { filename }
        }
        TaskResponse::DownloadFailed(e) => SessionEvent::DownloadFailed(e),
        TaskResponse::ResetElapsed(generation) => {
            if !app.is_current_reset(generation) {
                debug!(generation, "dropping stale reset");
                return;
            }
            SessionEvent::ResetElapsed
        }
    };
    app.dispatch(event);
}
