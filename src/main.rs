use mp3_downloader::app::App;
use mp3_downloader::config::{Args, SettingsStore};
use mp3_downloader::constants::{CHANNEL_CAPACITY, EVENT_POLL_TIMEOUT_MS};
use mp3_downloader::event_handler::{handle_key_event, handle_task_response};
use mp3_downloader::network::ServiceClient;
use mp3_downloader::ui::ui;

use std::fs::File;
use std::sync::Mutex;
use std::{error::Error, io, time::Duration};

use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn tracing_init(args: &Args) -> Result<(), Box<dyn Error>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(
            match args.verbose {
                0 => "mp3_downloader=info",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
            .parse()?,
        )
        .from_env_lossy();

    // The terminal belongs to the UI, so logs go to a file
    let log_path = args.log_path();
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log_file = File::create(&log_path)?;

    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_env_filter(env_filter)
        .with_writer(Mutex::new(log_file))
        .init();
    Ok(())
}

// MAIN LOOP (ASYNC)
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    tracing_init(&args)?;
    info!(?args, "mp3-downloader v{}", env!("CARGO_PKG_VERSION"));

    let client = ServiceClient::new(args.server.clone())?;
    let settings = SettingsStore::new(args.settings_path());

    // This hook catches panics and restores the terminal before printing the error
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        error!("panicked: {}", panic_info);
        original_hook(panic_info);
    }));

    // Setup Terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, rx) = tokio::sync::mpsc::channel(CHANNEL_CAPACITY);
    let app = App::new(tx, rx, client, settings, args.output_dir());

    let res = run_app(&mut terminal, app).await;

    // Teardown
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("ui loop failed: {}", err);
        println!("{:?}", err)
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, &app))?;

        // Handle background task results
        while let Ok(response) = app.rx.try_recv() {
            handle_task_response(&mut app, response);
        }

        // Handle input events
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if handle_key_event(&mut app, key)? {
                    info!("quit requested");
                    return Ok(()); // Quit signal received
                }
            }
        }

        // Let spawned tasks make progress between polls
        tokio::task::yield_now().await;
    }
}
