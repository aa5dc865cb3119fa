//! # Main Display Module
//!
//! This module contains the main display layout: the pitch graph on the
//! left and the settings sidebar on the right.

use iced::widget::{button, column, container, horizontal_space, pick_list, row, text, Space};
use iced::{Alignment, Element, Length};

use pitchtrace_core::notes;
use pitchtrace_core::AnalysisResult;

use crate::widgets::pitch_graph::PitchGraph;
use crate::{AppDisplayData, Message};

/// Step of the silence threshold buttons in dB.
const SILENCE_STEP_DB: f32 = 5.0;

/// Creates the complete main application view
pub fn create_main_view(data: &AppDisplayData) -> Element<'static, Message> {
    let graph = PitchGraph::new(
        data.results.clone(),
        data.camera.clone(),
        data.analysis_window_len,
    )
    .view();

    let main_content = row![
        container(graph).width(Length::Fill).height(Length::Fill),
        create_sidebar(data),
    ]
    .align_y(Alignment::Start);

    container(main_content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// Creates the settings sidebar widget.
///
/// Sections, top to bottom: the current pitch, the input device, the
/// silence threshold and a status line for capture errors.
fn create_sidebar(data: &AppDisplayData) -> Element<'static, Message> {
    let standard_pitch = data.camera.settings().standard_pitch;
    let (note_name, freq_text) = pitch_readout(&data.results, standard_pitch);

    let pitch_section = make_section(
        "Pitch",
        column![
            text(note_name).size(32),
            text(freq_text).size(16),
        ]
        .spacing(4)
        .into(),
    );

    let device_picker = pick_list(
        data.devices.clone(),
        data.selected_device.clone(),
        Message::DeviceSelected,
    )
    .placeholder("Default input")
    .width(Length::Fill);
    let device_section = make_section("Input device", device_picker.into());

    let threshold = data.silence_threshold_db;
    let threshold_section = make_section(
        "Silence threshold",
        row![
            button(text("-").size(16))
                .padding([4, 12])
                .on_press(Message::SilenceThresholdChanged(threshold - SILENCE_STEP_DB)),
            horizontal_space(),
            text(format!("{:.0} dB", threshold)).size(16),
            horizontal_space(),
            button(text("+").size(16))
                .padding([4, 12])
                .on_press(Message::SilenceThresholdChanged(threshold + SILENCE_STEP_DB)),
        ]
        .align_y(Alignment::Center)
        .into(),
    );

    let mut sections = column![pitch_section, device_section, threshold_section].spacing(20);
    if let Some(status) = &data.status {
        sections = sections.push(
            text(status.clone())
                .size(14)
                .color(iced::Color::from_rgb(0.9, 0.3, 0.3)),
        );
    }
    sections = sections.push(Space::with_height(Length::Fill));
    sections = sections.push(text("F11 fullscreen, Esc quit").size(12));

    container(sections.padding(15))
        .width(Length::Fixed(220.0))
        .height(Length::Fill)
        .into()
}

/// Creates a sidebar section with a title above its content.
fn make_section(title: &'static str, content: Element<'static, Message>) -> Element<'static, Message> {
    column![text(title).size(18), Space::with_height(6), content]
        .spacing(4)
        .into()
}

/// Note name and frequency of the newest result, or placeholders during silence.
fn pitch_readout(results: &[AnalysisResult], standard_pitch: f32) -> (String, String) {
    match results.last() {
        Some(result) if result.pitch_hz > 0.0 => {
            let note = notes::frequency_to_note(result.pitch_hz, standard_pitch);
            (
                notes::value_to_note_name(note),
                format!("{:.1} Hz", result.pitch_hz),
            )
        }
        _ => ("--".to_string(), "-- Hz".to_string()),
    }
}
