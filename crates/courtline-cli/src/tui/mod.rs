//! Courtline dashboard
//!
//! Read-only terminal view over the store.
//!
//! ## Layout
//!
//! - Top: summary counters and tab bar (Cases, Contacts, Inbox, Outbox, Audit)
//! - Left: records of the current tab
//! - Right: every field of the selected record
//!
//! ## Keys
//!
//! - j/k or ↑/↓: Move selection (or scroll the detail pane)
//! - gg/G: First/last record
//! - Tab/Shift+Tab: Next/previous tab
//! - h/l or ←/→: Switch focus between panes
//! - /: Filter current tab
//! - r: Reload from the store
//! - ?: Help
//! - q: Quit

mod app;
mod ui;

use std::fs::File;
use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use courtline_core::{Config, Store};

use app::{App, InputMode};

/// Run the dashboard
pub async fn run(config: Config) -> Result<()> {
    // Initialize TUI logging (file-based, only if COURTLINE_LOG is set)
    init_tui_logging(&config);

    let store = Store::open_with_config(config)?;
    let mut app = App::new(&store)?;
    info!("Dashboard opened on {}", store.config().data_dir.display());

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_app(&mut terminal, &mut app, &store).await;

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App, store: &Store) -> Result<()> {
    loop {
        app.check_status_timeout();

        terminal.draw(|frame| ui::draw(frame, app))?;

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                // Check for terminal events (non-blocking)
                if event::poll(Duration::from_millis(0))? {
                    if let Event::Key(key) = event::read()? {
                        // Only handle key press events (not release)
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }

                        // If help is showing, any key dismisses it
                        if app.show_help {
                            app.show_help = false;
                            continue;
                        }

                        match app.input_mode {
                            InputMode::Normal => handle_normal_mode(app, store, key.code, key.modifiers),
                            InputMode::Filter => handle_filter_mode(app, key.code),
                        }
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Handle key events in normal mode
fn handle_normal_mode(app: &mut App, store: &Store, code: KeyCode, modifiers: KeyModifiers) {
    // Clear pending 'g' if timeout expired (500ms)
    if let Some(time) = app.pending_g {
        if time.elapsed() > Duration::from_millis(500) {
            app.pending_g = None;
        }
    }

    match code {
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('h') | KeyCode::Left | KeyCode::Char('l') | KeyCode::Right => {
            app.toggle_pane();
        }
        KeyCode::Tab => app.next_tab(),
        KeyCode::BackTab => app.prev_tab(),

        // gg: first item
        KeyCode::Char('g') => {
            if app.pending_g.take().is_some() {
                app.move_to_first();
            } else {
                app.pending_g = Some(std::time::Instant::now());
            }
        }
        KeyCode::Char('G') => app.move_to_last(),

        KeyCode::Char('/') => app.enter_filter_mode(),
        KeyCode::Esc => app.clear_filter(),

        KeyCode::Char('r') => match app.refresh(store) {
            Ok(()) => app.set_status("Reloaded"),
            Err(e) => app.set_status(format!("Reload failed: {}", e)),
        },

        KeyCode::Char('?') => app.toggle_help(),

        _ => {}
    }
}

/// Handle key events while typing a filter
fn handle_filter_mode(app: &mut App, code: KeyCode) {
    match code {
        // Cancel filter
        KeyCode::Esc => {
            app.exit_filter_mode();
            app.clear_filter();
        }
        // Keep the filtered view
        KeyCode::Enter => app.exit_filter_mode(),
        KeyCode::Char(c) => app.push_filter_char(c),
        KeyCode::Backspace => app.pop_filter_char(),
        _ => {}
    }
}

/// Initialize file-based logging for the dashboard
fn init_tui_logging(config: &Config) {
    // Only log if COURTLINE_LOG is set
    let Ok(log_level) = std::env::var("COURTLINE_LOG") else {
        return;
    };

    let log_path = config.log_path();
    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "courtline_core={},courtline={}",
        log_level, log_level
    ));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();
}
