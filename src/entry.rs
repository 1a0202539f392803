use crate::audio_engine::CpalTransportFactory;
use crate::config::Config;
use crate::input::InputManager;
use crate::messages::SessionEvent;
use crate::notation::StaffEngraver;
use crate::paths;
use crate::session::EditorSession;
use crate::ui;
use std::path::PathBuf;

/// Files named on the command line that exist.
fn files_from_args() -> Vec<PathBuf> {
    std::env::args()
        .skip(1)
        .map(PathBuf::from)
        .filter(|path| {
            let ok = path.is_file();
            if !ok {
                log::warn!("ignoring {}: not a file", path.display());
            }
            ok
        })
        .collect()
}

pub fn run_app() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    log::info!("Starting rollsync...");

    let files_to_open = files_from_args();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("config unreadable, using defaults: {e}");
        Config::default()
    });

    let mut input = InputManager::new();
    if let Some(path) = paths::shortcuts_path().filter(|p| p.exists())
        && let Err(e) = input.load_shortcuts(&path)
    {
        log::warn!("could not load shortcuts from {}: {e}", path.display());
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("Panic: {info}");
        if let Some(dir) = paths::cache_dir() {
            let _ = std::fs::write(dir.join("last_panic.txt"), format!("{info:?}"));
        }
    }));

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "rollsync",
        native_options,
        Box::new(move |_cc| {
            let (events_tx, events_rx) = crossbeam_channel::unbounded::<SessionEvent>();
            let engraver = StaffEngraver::new();
            let engraving = engraver.output();
            let session = EditorSession::new(
                config,
                Box::new(CpalTransportFactory),
                Box::new(engraver),
            )
            .with_events(events_tx);

            let mut app = ui::RollsyncApp::new(session, events_rx, engraving, input);
            for path in &files_to_open {
                app.open_file_from_path(path);
            }
            Ok(Box::new(app))
        }),
    )?;

    Ok(())
}
