use crate::config::{Settings, SettingsStore};
use crate::constants::RESET_DELAY;
use crate::error::AppError;
use crate::models::{StatusMessage, Theme};
use crate::network::{sanitize_file_name, unique_path, ServiceClient, TaskResponse};
use crate::session::{Effect, Session, SessionEvent};

use futures_util::StreamExt;
use reqwest::Response;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt; // Required for streaming to file
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct App {
    pub session: Session,
    pub theme: Theme,
    pub settings: SettingsStore,
    pub output_dir: PathBuf,
    pub reset_delay: Duration,
    pub tx: mpsc::Sender<TaskResponse>,
    pub rx: mpsc::Receiver<TaskResponse>,
    pub client: Arc<ServiceClient>,
    reset_task: Option<JoinHandle<()>>,
    reset_generation: u64,
}

impl App {
    pub fn new(
        tx: mpsc::Sender<TaskResponse>,
        rx: mpsc::Receiver<TaskResponse>,
        client: ServiceClient,
        settings: SettingsStore,
        output_dir: PathBuf,
    ) -> Self {
        let theme = settings.load().theme;
        info!(?theme, server = %client.base_url(), "starting");
        Self {
            session: Session::new(),
            theme,
            settings,
            output_dir,
            reset_delay: RESET_DELAY,
            tx,
            rx,
            client: Arc::new(client),
            reset_task: None,
            reset_generation: 0,
        }
    }

    /// Feeds an event through the session and carries out what it asks for.
    pub fn dispatch(&mut self, event: SessionEvent) {
        for effect in self.session.update(event) {
            self.run_effect(effect);
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::FetchMetadata { link } => self.fetch_metadata(link),
            Effect::Download { url, title } => self.trigger_download(url, title),
            Effect::ScheduleReset => self.schedule_reset(),
            Effect::CancelReset => self.cancel_reset(),
        }
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        let settings = Settings { theme: self.theme };
        if let Err(e) = self.settings.save(&settings) {
            warn!(path = %self.settings.path().display(), "{}", e);
            self.session.status = Some(StatusMessage::error(e.to_string()));
        }
    }

    /// Whether an automatic reset is waiting to fire.
    pub fn reset_pending(&self) -> bool {
        self.reset_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Reset messages from an earlier, cancelled timer are stale.
    pub fn is_current_reset(&self, generation: u64) -> bool {
        generation == self.reset_generation
    }

    fn schedule_reset(&mut self) {
        self.cancel_reset();
        let generation = self.reset_generation;
        let delay = self.reset_delay;
        let tx = self.tx.clone();
        self.reset_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(TaskResponse::ResetElapsed(generation)).await;
        }));
    }

    fn cancel_reset(&mut self) {
        if let Some(task) = self.reset_task.take() {
            task.abort();
        }
        self.reset_generation += 1;
    }

    fn fetch_metadata(&mut self, link: String) {
        let tx = self.tx.clone();
        let client = Arc::clone(&self.client);

        tokio::spawn(async move {
            let msg = match client.fetch_metadata(&link).await {
                Ok(preview) => TaskResponse::MetadataLoaded(preview),
                Err(e) => {
                    warn!(%link, "metadata lookup failed: {}", e);
                    TaskResponse::MetadataFailed(e)
                }
            };
            let _ = tx.send(msg).await;
        });
    }

    fn trigger_download(&mut self, url: String, title: String) {
        let tx = self.tx.clone();
        let client = Arc::clone(&self.client);
        let output_dir = self.output_dir.clone();

        tokio::spawn(async move {
            let msg = match download_to(&client, &url, &title, output_dir, &tx).await {
                Ok((filename, path)) => {
                    info!(path = %path.display(), "saved download");
                    TaskResponse::DownloadSaved(filename, path)
                }
                Err(e) => {
                    error!(%url, "download failed: {}", e);
                    TaskResponse::DownloadFailed(e)
                }
            };
            let _ = tx.send(msg).await;
        });
    }
}

async fn download_to(
    client: &ServiceClient,
    url: &str,
    title: &str,
    output_dir: PathBuf,
    tx: &mpsc::Sender<TaskResponse>,
) -> Result<(String, PathBuf), AppError> {
    let download = client.request_download(url, title).await?;

    tokio::fs::create_dir_all(&output_dir).await?;
    let path = unique_path(&output_dir, &sanitize_file_name(&download.filename));
    let mut partial = path.clone().into_os_string();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    if let Err(e) = stream_into(&partial, download.response, tx).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }
    tokio::fs::rename(&partial, &path).await?;

    Ok((download.filename, path))
}

async fn stream_into(
    path: &Path,
    response: Response,
    tx: &mpsc::Sender<TaskResponse>,
) -> Result<(), AppError> {
    let total_size = response.content_length();
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(item) = stream.next().await {
        let chunk = item?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        let _ = tx
            .send(TaskResponse::DownloadProgress(downloaded, total_size))
            .await;
    }
    file.flush().await?;
    Ok(())
}
