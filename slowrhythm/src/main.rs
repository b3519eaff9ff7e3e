//! slowRhythm — MIDI to rhythm game chart editor

mod app;
mod audio;
mod repaint;
mod theme;

use app::SlowRhythmApp;
use rhythmcore::Settings;
use std::path::PathBuf;
use theme::SlowTheme;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_INPUT: &str = "input.mid";

fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("slowrhythm").join("settings.json"))
}

fn load_settings() -> Settings {
    let Some(path) = settings_path() else {
        return Settings::default();
    };
    if path.exists() {
        return Settings::load_or_default(&path);
    }
    // First run: write the defaults so they can be edited by hand.
    let settings = Settings::default();
    match settings.save(&path) {
        Ok(()) => info!(path = %path.display(), "wrote default settings"),
        Err(err) => warn!(path = %path.display(), %err, "could not write default settings"),
    }
    settings
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("slowrhythm=info,rhythmcore=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let input = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT));
    let settings = load_settings();

    let viewport = egui::ViewportBuilder::default()
        .with_title("slowRhythm")
        .with_inner_size([520.0, 820.0])
        .with_min_inner_size([360.0, 400.0])
        .with_drag_and_drop(true);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "slowRhythm",
        options,
        Box::new(move |cc| {
            SlowTheme::default().apply(&cc.egui_ctx);
            let mut app = SlowRhythmApp::new(settings);
            app.load_from_path(input);
            Box::new(app)
        }),
    )
}
