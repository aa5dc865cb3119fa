//! # Pitch Graph Widget
//!
//! Scrolling pitch trace drawn over a grid of note lines. The visible range
//! comes from the [`Camera`]; the newest result is at the right edge once the
//! history is full.

use iced::alignment;
use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{mouse, Color, Element, Pixels, Point, Rectangle, Renderer, Size, Theme};

use pitchtrace_core::notes;
use pitchtrace_core::trace::trace_segments;
use pitchtrace_core::{AnalysisResult, Camera};

const BACKGROUND_COLOR: Color = iced::color!(32, 32, 32);
const NOTE_LINE_COLOR: Color = iced::color!(160, 160, 160);
const SHARP_NOTE_LINE_COLOR: Color = iced::color!(96, 96, 96);
const C_NOTE_LINE_COLOR: Color = iced::color!(255, 255, 255);
const FOREGROUND_LINE_COLOR: Color = iced::color!(255, 165, 0);

const MIN_LABEL_SIZE: f32 = 11.0;
const MAX_LABEL_SIZE: f32 = 22.0;
/// Left margin of the note labels, relative to the label size.
const LABEL_MARGIN: f32 = 0.4;

pub struct PitchGraph {
    results: Vec<AnalysisResult>,
    camera: Camera,
    analysis_window_len: usize,
}

impl PitchGraph {
    pub fn new(results: Vec<AnalysisResult>, camera: Camera, analysis_window_len: usize) -> Self {
        Self {
            results,
            camera,
            analysis_window_len,
        }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fill),
        )
        .into()
    }
}

impl<Message> canvas::Program<Message> for PitchGraph {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), BACKGROUND_COLOR);

        if !bounds.width.is_finite() || !bounds.height.is_finite() || bounds.height <= 0.0 {
            return vec![frame.into_geometry()];
        }

        let height = bounds.height;
        let visible = self.camera.visible_notes();
        let note_count = visible.clone().count().max(1);
        let text_size = label_size(height, note_count);
        let column_end = text_size * (3.0 + LABEL_MARGIN);

        // Note names and grid lines
        for note in visible {
            let y = self.camera.note_to_y(note, height);
            if !(0.0..=height).contains(&y) {
                continue;
            }
            let color = line_color(note);

            frame.fill_text(canvas::Text {
                content: notes::value_to_note_name(note),
                position: Point::new(text_size * LABEL_MARGIN, y),
                color,
                size: Pixels(text_size),
                vertical_alignment: alignment::Vertical::Center,
                ..canvas::Text::default()
            });
            frame.stroke(
                &Path::line(Point::new(column_end, y), Point::new(bounds.width, y)),
                Stroke::default().with_color(color).with_width(1.0),
            );
        }

        // Pitch curve, one path per voiced run
        let plot = Size::new((bounds.width - column_end).max(0.0), height);
        let highest_hz = self.camera.settings().highest_displayable_hz;
        for segment in trace_segments(&self.results, highest_hz) {
            let curve = Path::new(|builder| {
                for (k, &(index, pitch)) in segment.iter().enumerate() {
                    let point = Point::new(
                        column_end + x_offset(index, self.analysis_window_len, plot.width),
                        self.camera.frequency_to_y(pitch, plot.height),
                    );
                    if k == 0 {
                        builder.move_to(point);
                    } else {
                        builder.line_to(point);
                    }
                }
            });
            frame.stroke(&curve, Stroke::default().with_color(FOREGROUND_LINE_COLOR).with_width(2.0));
        }

        vec![frame.into_geometry()]
    }
}

/// Label size that gives each visible note about half of its row.
fn label_size(height: f32, note_count: usize) -> f32 {
    (0.5 * height / note_count as f32).clamp(MIN_LABEL_SIZE, MAX_LABEL_SIZE)
}

/// C lines are bright, sharps dim and the remaining naturals in between.
fn line_color(note: i32) -> Color {
    if notes::is_sharp(note) {
        SHARP_NOTE_LINE_COLOR
    } else if note.rem_euclid(12) == 0 {
        C_NOTE_LINE_COLOR
    } else {
        NOTE_LINE_COLOR
    }
}

/// Horizontal offset of history entry `index` within a plot `width` wide.
fn x_offset(index: usize, analysis_window_len: usize, width: f32) -> f32 {
    index as f32 / analysis_window_len.max(1) as f32 * width
}
