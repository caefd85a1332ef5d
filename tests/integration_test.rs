use mp3_downloader::app::App;
use mp3_downloader::config::SettingsStore;
use mp3_downloader::event_handler::{handle_key_event, handle_task_response};
use mp3_downloader::models::Theme;
use mp3_downloader::network::{ServiceClient, TaskResponse};
use mp3_downloader::session::Phase;
use mp3_downloader::ui::ui;

use std::time::Duration;
use tempfile::TempDir;
use url::Url;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::TestBackend;

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LINK: &str = "https://youtu.be/abc";

struct Harness {
    app: App,
    settings_dir: TempDir,
    output_dir: TempDir,
}

fn harness(server_uri: &str) -> Harness {
    let settings_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let app = build_app(server_uri, &settings_dir, &output_dir);
    Harness {
        app,
        settings_dir,
        output_dir,
    }
}

fn build_app(server_uri: &str, settings_dir: &TempDir, output_dir: &TempDir) -> App {
    let (tx, rx) = tokio::sync::mpsc::channel(10);
    let client = ServiceClient::new(Url::parse(server_uri).unwrap()).unwrap();
    let settings = SettingsStore::new(settings_dir.path().join("settings.json"));
    App::new(tx, rx, client, settings, output_dir.path().to_path_buf())
}

fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
    KeyEvent {
        code,
        modifiers,
        kind: KeyEventKind::Press,
        state: KeyEventState::empty(),
    }
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        let quit = handle_key_event(app, key(KeyCode::Char(c), KeyModifiers::empty())).unwrap();
        assert!(!quit);
    }
}

fn press_enter(app: &mut App) {
    handle_key_event(app, key(KeyCode::Enter, KeyModifiers::empty())).unwrap();
}

/// Feeds background results into the app until one matches `done`.
async fn pump_until(app: &mut App, done: impl Fn(&TaskResponse) -> bool) {
    let wait = async {
        while let Some(resp) = app.rx.recv().await {
            let stop = done(&resp);
            handle_task_response(app, resp);
            if stop {
                break;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("timed out waiting for a background task");
}

async fn mount_song_a(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/get_metadata"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("url=https%3A%2F%2Fyoutu.be%2Fabc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "title": "Song A",
            "thumbnail_url": "https://x/y.jpg",
            "url": LINK,
        })))
        .mount(mock_server)
        .await;
}

async fn load_preview(app: &mut App) {
    type_text(app, LINK);
    press_enter(app);
    assert_eq!(app.session.phase, Phase::Searching);
    pump_until(app, |r| {
        matches!(
            r,
            TaskResponse::MetadataLoaded(_) | TaskResponse::MetadataFailed(_)
        )
    })
    .await;
}

fn render_to_string(app: &App) -> String {
    let backend = TestBackend::new(100, 24);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(|f| ui(f, app)).unwrap();
    terminal
        .backend()
        .buffer()
        .content()
        .iter()
        .map(|c| c.symbol())
        .collect()
}

#[tokio::test]
async fn test_metadata_lookup_shows_preview() {
    let mock_server = MockServer::start().await;
    mount_song_a(&mock_server).await;

    let mut h = harness(&mock_server.uri());
    load_preview(&mut h.app).await;

    let session = &h.app.session;
    assert_eq!(session.phase, Phase::Previewed);
    assert_eq!(session.preview.as_ref().unwrap().title, "Song A");
    assert_eq!(session.preview.as_ref().unwrap().thumbnail_url, "https://x/y.jpg");
    assert_eq!(session.hidden.url, LINK);
    assert_eq!(session.hidden.title, "Song A");
    assert!(session.download_enabled);
    assert!(!session.search_visible);

    let screen = render_to_string(&h.app);
    assert!(screen.contains("Song A"));
    assert!(screen.contains("Download MP3 now"));
    assert!(!screen.contains("Enter: Search"));
}

#[tokio::test]
async fn test_blank_link_never_hits_the_server() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut h = harness(&mock_server.uri());
    type_text(&mut h.app, "   ");
    press_enter(&mut h.app);

    assert_eq!(h.app.session.phase, Phase::Idle);
    let status = h.app.session.status.clone().unwrap();
    assert!(status.is_error);
    assert_eq!(status.text, "Please enter a YouTube link.");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.app.rx.try_recv().is_err());
}

#[tokio::test]
async fn test_service_error_is_shown_and_search_reenabled() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/get_metadata"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(serde_json::json!({"error": "Invalid or unsupported link."})),
        )
        .mount(&mock_server)
        .await;

    let mut h = harness(&mock_server.uri());
    load_preview(&mut h.app).await;

    let session = &h.app.session;
    assert_eq!(session.phase, Phase::Idle);
    assert!(session.can_search());
    assert!(!session.download_enabled);
    assert_eq!(
        session.status.as_ref().unwrap().text,
        "Error: Invalid or unsupported link."
    );
}

#[tokio::test]
async fn test_service_error_without_body_uses_generic_message() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/get_metadata"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&mock_server)
        .await;

    let mut h = harness(&mock_server.uri());
    load_preview(&mut h.app).await;

    assert_eq!(
        h.app.session.status.as_ref().unwrap().text,
        "Error: Invalid link or server problem."
    );
}

#[tokio::test]
async fn test_unreachable_server_reports_connection_error() {
    // Grab a free port and release it so nothing is listening there.
    let uri = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };

    let mut h = harness(&uri);
    load_preview(&mut h.app).await;

    let status = h.app.session.status.clone().unwrap();
    assert!(status.is_error);
    assert!(status.text.starts_with("Connection error. Check that the server is running."));
    assert!(h.app.session.can_search());
}

#[tokio::test]
async fn test_download_uses_content_disposition_and_resets() {
    let mock_server = MockServer::start().await;
    mount_song_a(&mock_server).await;
    Mock::given(method("POST"))
        .and(path("/download_mp3"))
        .and(body_string_contains("title=Song+A"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=\"song.mp3\"")
                .set_body_raw(b"ID3fake-audio".to_vec(), "audio/mp3"),
        )
        .mount(&mock_server)
        .await;

    let mut h = harness(&mock_server.uri());
    h.app.reset_delay = Duration::from_millis(100);
    load_preview(&mut h.app).await;

    press_enter(&mut h.app);
    assert_eq!(h.app.session.phase, Phase::Downloading);
    assert!(!h.app.session.download_enabled);

    pump_until(&mut h.app, |r| {
        matches!(
            r,
            TaskResponse::DownloadSaved(..) | TaskResponse::DownloadFailed(_)
        )
    })
    .await;

    let saved = h.output_dir.path().join("song.mp3");
    assert_eq!(std::fs::read(&saved).unwrap(), b"ID3fake-audio");
    assert_eq!(h.app.session.phase, Phase::Saved);
    assert!(!h.app.session.download_enabled);
    assert!(h.app.reset_pending());
    assert_eq!(
        h.app.session.status.as_ref().unwrap().text,
        "Download of \"song.mp3\" finished successfully!"
    );

    pump_until(&mut h.app, |r| matches!(r, TaskResponse::ResetElapsed(_))).await;

    let session = &h.app.session;
    assert_eq!(session.phase, Phase::Idle);
    assert!(session.link.is_empty());
    assert!(session.hidden.url.is_empty());
    assert!(session.hidden.title.is_empty());
    assert!(session.preview.is_none());
    assert!(session.status.is_none());
    assert!(session.can_search());
}

#[tokio::test]
async fn test_download_without_header_is_named_after_title() {
    let mock_server = MockServer::start().await;
    mount_song_a(&mock_server).await;
    Mock::given(method("POST"))
        .and(path("/download_mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"audio".to_vec(), "audio/mp3"))
        .mount(&mock_server)
        .await;

    let mut h = harness(&mock_server.uri());
    load_preview(&mut h.app).await;
    handle_key_event(&mut h.app, key(KeyCode::Char('d'), KeyModifiers::CONTROL)).unwrap();

    pump_until(&mut h.app, |r| {
        matches!(
            r,
            TaskResponse::DownloadSaved(..) | TaskResponse::DownloadFailed(_)
        )
    })
    .await;

    assert!(h.output_dir.path().join("Song A.mp3").exists());
}

#[tokio::test]
async fn test_download_failure_leaves_control_disabled() {
    let mock_server = MockServer::start().await;
    mount_song_a(&mock_server).await;
    Mock::given(method("POST"))
        .and(path("/download_mp3"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(serde_json::json!({"error": "ERROR: video unavailable"})),
        )
        .mount(&mock_server)
        .await;

    let mut h = harness(&mock_server.uri());
    load_preview(&mut h.app).await;
    press_enter(&mut h.app);

    pump_until(&mut h.app, |r| {
        matches!(
            r,
            TaskResponse::DownloadSaved(..) | TaskResponse::DownloadFailed(_)
        )
    })
    .await;

    let session = &h.app.session;
    assert_eq!(session.phase, Phase::Previewed);
    assert!(!session.download_enabled);
    assert!(!session.can_download());
    assert_eq!(
        session.status.as_ref().unwrap().text,
        "Download error: ERROR: video unavailable"
    );
    assert!(std::fs::read_dir(h.output_dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_new_search_cancels_pending_reset() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/get_metadata"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "title": "Song A",
            "thumbnail_url": "https://x/y.jpg",
            "url": LINK,
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/download_mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"audio".to_vec(), "audio/mp3"))
        .mount(&mock_server)
        .await;

    let mut h = harness(&mock_server.uri());
    h.app.reset_delay = Duration::from_millis(200);
    load_preview(&mut h.app).await;
    press_enter(&mut h.app);
    pump_until(&mut h.app, |r| matches!(r, TaskResponse::DownloadSaved(..))).await;
    assert!(h.app.reset_pending());

    // Edit the link and search again before the reset fires.
    type_text(&mut h.app, "x");
    assert_eq!(h.app.session.phase, Phase::Idle);
    press_enter(&mut h.app);
    assert!(!h.app.reset_pending());
    pump_until(&mut h.app, |r| matches!(r, TaskResponse::MetadataLoaded(_))).await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    while let Ok(resp) = h.app.rx.try_recv() {
        handle_task_response(&mut h.app, resp);
    }

    assert_eq!(h.app.session.link, "https://youtu.be/abcx");
    assert_eq!(h.app.session.phase, Phase::Previewed);
    assert!(h.app.session.download_enabled);
}

#[tokio::test]
async fn test_typing_collapses_preview_without_clearing_text() {
    let mock_server = MockServer::start().await;
    mount_song_a(&mock_server).await;

    let mut h = harness(&mock_server.uri());
    load_preview(&mut h.app).await;
    handle_key_event(&mut h.app, key(KeyCode::Backspace, KeyModifiers::empty())).unwrap();

    let session = &h.app.session;
    assert_eq!(session.link, "https://youtu.be/ab");
    assert!(session.preview.is_none());
    assert!(session.status.is_none());
    assert!(session.search_visible);

    let screen = render_to_string(&h.app);
    assert!(screen.contains("Enter: Search"));
    assert!(!screen.contains("Download MP3 now"));
}

#[tokio::test]
async fn test_theme_persists_across_restart() {
    let mock_server = MockServer::start().await;
    let h = harness(&mock_server.uri());
    let Harness {
        mut app,
        settings_dir,
        output_dir,
    } = h;

    assert_eq!(app.theme, Theme::Pink);
    assert!(render_to_string(&app).contains("Downloader Glitter-Pink"));

    handle_key_event(&mut app, key(KeyCode::Char('t'), KeyModifiers::CONTROL)).unwrap();
    assert_eq!(app.theme, Theme::Blue);
    drop(app);

    let reloaded = build_app(&mock_server.uri(), &settings_dir, &output_dir);
    assert_eq!(reloaded.theme, Theme::Blue);
    assert!(reloaded.theme.is_checked());
    assert!(render_to_string(&reloaded).contains("Cyber Blue Downloader"));
}

#[tokio::test]
async fn test_escape_quits() {
    let mock_server = MockServer::start().await;
    let mut h = harness(&mock_server.uri());
    let quit = handle_key_event(&mut h.app, key(KeyCode::Esc, KeyModifiers::empty())).unwrap();
    assert!(quit);
}

#[tokio::test]
async fn test_reset_queued_before_new_submit_is_ignored() {
    let mock_server = MockServer::start().await;
    mount_song_a(&mock_server).await;

    let mut h = harness(&mock_server.uri());
    type_text(&mut h.app, LINK);
    press_enter(&mut h.app);
    assert_eq!(h.app.session.phase, Phase::Searching);

    // Generation 0 was current before the submit bumped it.
    let before = h.app.session.clone();
    handle_task_response(&mut h.app, TaskResponse::ResetElapsed(0));
    assert_eq!(h.app.session, before);
    assert_eq!(h.app.session.link, LINK);
}

#[tokio::test]
async fn test_theme_toggle_survives_failed_save() {
    let mock_server = MockServer::start().await;
    let settings_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();

    // A directory where the settings file should be cannot be written.
    let (tx, rx) = tokio::sync::mpsc::channel(10);
    let client = ServiceClient::new(Url::parse(&mock_server.uri()).unwrap()).unwrap();
    let settings = SettingsStore::new(settings_dir.path());
    let mut app = App::new(tx, rx, client, settings, output_dir.path().to_path_buf());

    handle_key_event(&mut app, key(KeyCode::Char('t'), KeyModifiers::CONTROL)).unwrap();

    assert_eq!(app.theme, Theme::Blue);
    let status = app.session.status.clone().unwrap();
    assert!(status.is_error);
    assert!(status.text.starts_with("could not save settings"));
}

#[tokio::test]
async fn test_success_message_names_file_on_disk() {
    let mock_server = MockServer::start().await;
    mount_song_a(&mock_server).await;
    Mock::given(method("POST"))
        .and(path("/download_mp3"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=\"song.mp3\"")
                .set_body_raw(b"new".to_vec(), "audio/mp3"),
        )
        .mount(&mock_server)
        .await;

    let mut h = harness(&mock_server.uri());
    std::fs::write(h.output_dir.path().join("song.mp3"), b"old").unwrap();
    load_preview(&mut h.app).await;
    press_enter(&mut h.app);

    pump_until(&mut h.app, |r| {
        matches!(
            r,
            TaskResponse::DownloadSaved(..) | TaskResponse::DownloadFailed(_)
        )
    })
    .await;

    assert_eq!(std::fs::read(h.output_dir.path().join("song.mp3")).unwrap(), b"old");
    assert_eq!(std::fs::read(h.output_dir.path().join("song (1).mp3")).unwrap(), b"new");
    assert_eq!(
        h.app.session.status.as_ref().unwrap().text,
        "Download of \"song (1).mp3\" finished successfully!"
    );
}

#[tokio::test]
async fn test_ctrl_u_clears_link() {
    let mock_server = MockServer::start().await;
    mount_song_a(&mock_server).await;

    let mut h = harness(&mock_server.uri());
    load_preview(&mut h.app).await;
    handle_key_event(&mut h.app, key(KeyCode::Char('u'), KeyModifiers::CONTROL)).unwrap();

    let session = &h.app.session;
    assert!(session.link.is_empty());
    assert_eq!(session.phase, Phase::Idle);
    assert!(session.preview.is_none());
    assert!(session.can_search());
}
