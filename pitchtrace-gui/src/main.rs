//! # Pitch Trace - Real-time Vocal Pitch Visualizer
//!
//! This module contains the main GUI application. It owns the pitch tracker
//! and the camera, and redraws the pitch graph on every tick.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application with dark theme
//! - **Capture Thread**: Owned by the tracker; fills the shared analysis window
//! - **Updates**: Timer subscription at the configured frame rate; every tick
//!   advances the camera, then reads the filtered history

mod settings;
mod ui;
mod widgets;

use anyhow::Context;
use iced::keyboard::{self, key, Key};
use iced::{window, Element, Size, Subscription, Task, Theme};
use std::time::{Duration, Instant};

use pitchtrace_core::audio::AudioDevice;
use pitchtrace_core::{AnalysisResult, Camera, PitchTracker};
use settings::{AppSettings, SETTINGS_PATH};
use ui::main_display::create_main_view;

/// Main entry point for the Pitch Trace application.
///
/// Loads the settings, starts tracking on the configured device and runs the
/// GUI until the window is closed.
pub fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Pitch Trace {}", env!("CARGO_PKG_VERSION"));
    let settings = AppSettings::load(SETTINGS_PATH)?;
    settings.log_summary();

    let tracker = PitchTracker::new(settings.tracker_config()).context("invalid tracker configuration")?;
    let app = PitchTraceApp::new(tracker, &settings);

    let startup = if settings.start_in_fullscreen {
        Task::done(Message::ToggleFullscreen)
    } else {
        Task::none()
    };

    iced::application("Pitch Trace", PitchTraceApp::update, PitchTraceApp::view)
        .subscription(PitchTraceApp::subscription)
        .theme(PitchTraceApp::theme)
        .window_size(Size::new(settings.window_width, settings.window_height))
        .run_with(move || (app, startup))
        .map_err(|e| anyhow::anyhow!("GUI error: {e}"))?;

    log::info!("Application finished");
    Ok(())
}

/// Application message types for the Iced GUI framework.
#[derive(Debug, Clone)]
pub enum Message {
    /// Frame timer tick
    Tick(Instant),
    /// User picked an input device
    DeviceSelected(AudioDevice),
    /// New silence threshold in dB
    SilenceThresholdChanged(f32),
    ToggleFullscreen,
    Exit,
}

/// UI-specific data needed for rendering the interface.
#[derive(Debug, Clone)]
pub struct AppDisplayData {
    /// Filtered history as of the last tick
    pub results: Vec<AnalysisResult>,
    pub camera: Camera,
    pub analysis_window_len: usize,
    pub devices: Vec<AudioDevice>,
    pub selected_device: Option<AudioDevice>,
    pub silence_threshold_db: f32,
    /// Last capture error shown to the user
    pub status: Option<String>,
}

struct PitchTraceApp {
    tracker: PitchTracker,
    frame_interval: Duration,
    last_tick: Option<Instant>,
    fullscreen: bool,
    /// Whether a capture session is expected to be running
    capturing: bool,

    // Single source of truth for all display data
    display_data: AppDisplayData,
}

impl PitchTraceApp {
    /// Creates the application and starts tracking.
    ///
    /// A device that cannot be opened is reported in the sidebar so another
    /// one can be picked.
    fn new(mut tracker: PitchTracker, settings: &AppSettings) -> Self {
        let devices = tracker.input_devices().unwrap_or_else(|e| {
            log::warn!("Failed to list input devices: {}", e);
            Vec::new()
        });
        let selected_device = settings
            .device_index
            .and_then(|index| devices.iter().find(|d| d.index == index).cloned());

        let status = match tracker.start_tracking() {
            Ok(()) => None,
            Err(e) => {
                log::error!("Failed to start tracking: {}", e);
                Some(e.to_string())
            }
        };

        Self {
            frame_interval: Duration::from_secs_f64(1.0 / settings.target_fps.max(1) as f64),
            last_tick: None,
            fullscreen: false,
            capturing: status.is_none(),
            display_data: AppDisplayData {
                results: Vec::new(),
                camera: Camera::new(settings.camera_settings()),
                analysis_window_len: tracker.analysis_window_len(),
                devices,
                selected_device,
                silence_threshold_db: tracker.config().silence_threshold_db,
                status,
            },
            tracker,
        }
    }

    /// Handles application state updates based on incoming messages.
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick(now) => {
                self.on_tick(now);
                Task::none()
            }
            Message::DeviceSelected(device) => {
                let result = self.tracker.change_device(device.index);
                self.display_data.selected_device = Some(device);
                self.record_restart(result);
                Task::none()
            }
            Message::SilenceThresholdChanged(db) => {
                let result = self.tracker.set_silence_threshold(db);
                self.display_data.silence_threshold_db = self.tracker.config().silence_threshold_db;
                self.record_restart(result);
                Task::none()
            }
            Message::ToggleFullscreen => {
                self.fullscreen = !self.fullscreen;
                let mode = if self.fullscreen {
                    window::Mode::Fullscreen
                } else {
                    window::Mode::Windowed
                };
                window::get_latest().and_then(move |id| window::change_mode(id, mode))
            }
            Message::Exit => {
                log::info!("Exit requested, stopping capture");
                if let Err(e) = self.tracker.stop_tracking() {
                    log::error!("Failed to stop tracking: {}", e);
                }
                iced::exit()
            }
        }
    }

    /// Advances the camera and takes a fresh snapshot of the history.
    fn on_tick(&mut self, now: Instant) {
        let dt = self
            .last_tick
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_tick = Some(now);

        let data = &mut self.display_data;
        data.camera.advance(dt);
        data.results = self.tracker.get_display_results();
        if !data.results.is_empty() {
            data.camera.update_bounds(&data.results);
        }

        if self.capturing && !self.tracker.is_running() {
            log::warn!("Audio input stopped unexpectedly");
            self.capturing = false;
            data.status = Some("Audio input stopped".to_string());
        }
    }

    /// Updates the status after the tracker was restarted.
    fn record_restart(&mut self, result: pitchtrace_core::Result<()>) {
        match result {
            Ok(()) => {
                self.capturing = true;
                self.display_data.status = None;
            }
            Err(e) => {
                log::error!("Failed to restart tracking: {}", e);
                self.capturing = false;
                self.display_data.status = Some(e.to_string());
            }
        }
        self.display_data.analysis_window_len = self.tracker.analysis_window_len();
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display_data)
    }

    /// Frame timer plus the global key bindings.
    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            iced::time::every(self.frame_interval).map(Message::Tick),
            keyboard::on_key_press(handle_key),
        ])
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn handle_key(key: Key, _modifiers: keyboard::Modifiers) -> Option<Message> {
    match key.as_ref() {
        Key::Named(key::Named::Escape) => Some(Message::Exit),
        Key::Named(key::Named::F11) => Some(Message::ToggleFullscreen),
        _ => None,
    }
}
