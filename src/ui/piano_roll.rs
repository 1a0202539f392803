use crate::constants::{
    COLOR_GRID_BAR, COLOR_GRID_BEAT, COLOR_GRID_SUBDIVISION, COLOR_NOTE, COLOR_NOTE_ACTIVE,
    COLOR_NOTE_SELECTED, COLOR_PLAYHEAD, COLOR_ROLL_BG, COLOR_ROW_BLACK_KEY, PIANO_KEY_WIDTH,
};
use crate::selection::PointerModifiers;
use crate::session::EditorSession;
use crate::time_utils::{GridLineKind, RollLayout};
use eframe::egui;
use std::collections::BTreeSet;

pub fn is_black_key(pitch: u8) -> bool {
    matches!(pitch % 12, 1 | 3 | 6 | 8 | 10)
}

/// Piano roll with its keyboard column. Pointer input is translated into
/// roll content coordinates and handed to the session.
#[derive(Default)]
pub struct PianoRollView {
    scroll_y: f32,
    pressing: bool,
}

impl PianoRollView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, ui: &mut egui::Ui, session: &mut EditorSession, show_keyboard: bool) {
        let available = ui.available_rect_before_wrap();
        let key_width = if show_keyboard { PIANO_KEY_WIDTH } else { 0.0 };
        let roll_rect = egui::Rect::from_min_max(
            available.min + egui::vec2(key_width, 0.0),
            available.max,
        );
        session.set_view(roll_rect.width(), roll_rect.height());

        let response = ui.allocate_rect(available, egui::Sense::click_and_drag());
        self.handle_scroll(ui, &response, session, roll_rect);
        self.handle_pointer(ui, &response, session, roll_rect);

        let layout = session.layout();
        let origin = roll_rect.min - egui::vec2(session.scroll_left(), self.scroll_y);
        let painter = ui.painter_at(available);

        let roll_painter = painter.with_clip_rect(roll_rect);
        roll_painter.rect_filled(roll_rect, 0.0, COLOR_ROLL_BG);
        self.draw_rows(&roll_painter, roll_rect, &layout, origin);
        self.draw_grid(&roll_painter, roll_rect, session, &layout, origin);
        self.draw_notes(&roll_painter, roll_rect, session, &layout, origin);

        if let Some(band) = session.selection_box() {
            let band = band.translate(origin.to_vec2());
            roll_painter.rect_filled(band, 0.0, crate::constants::COLOR_SELECTION_BOX);
            roll_painter.rect_stroke(
                band,
                0.0,
                egui::Stroke::new(1.0, egui::Color32::from_rgb(100, 140, 220)),
                egui::StrokeKind::Inside,
            );
        }

        let playhead = roll_rect.left() + session.playhead_x() - session.scroll_left();
        if playhead >= roll_rect.left() && playhead <= roll_rect.right() {
            roll_painter.line_segment(
                [
                    egui::pos2(playhead, roll_rect.top()),
                    egui::pos2(playhead, roll_rect.bottom()),
                ],
                egui::Stroke::new(2.0, COLOR_PLAYHEAD),
            );
        }

        if show_keyboard {
            let key_rect =
                egui::Rect::from_min_size(available.min, egui::vec2(key_width, available.height()));
            draw_keyboard(
                &painter.with_clip_rect(key_rect),
                key_rect,
                &layout,
                session.active_pitches(),
                origin.y,
            );
        }
    }

    fn handle_scroll(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        session: &mut EditorSession,
        roll_rect: egui::Rect,
    ) {
        let max_scroll_y = (session.layout().content_height() - roll_rect.height()).max(0.0);
        if response.hovered() {
            let (delta, zoom) = ui.input(|i| (i.smooth_scroll_delta, i.zoom_delta()));
            if zoom != 1.0 {
                session.set_zoom(session.pixels_per_second() * zoom);
            } else {
                if delta.x != 0.0 {
                    session.scroll_by(-delta.x);
                }
                self.scroll_y -= delta.y;
            }
        }
        self.scroll_y = self.scroll_y.clamp(0.0, max_scroll_y);
    }

    fn handle_pointer(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        session: &mut EditorSession,
        roll_rect: egui::Rect,
    ) {
        let (pressed, released, pos, modifiers) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.interact_pos(),
                i.modifiers,
            )
        });
        let Some(pos) = pos else {
            return;
        };
        let offset = egui::vec2(session.scroll_left(), self.scroll_y);
        let content = (pos - roll_rect.min + offset).to_pos2();

        if pressed && response.hovered() && roll_rect.contains(pos) {
            self.pressing = true;
            session.pointer_down(
                content,
                PointerModifiers {
                    toggle: modifiers.shift || modifiers.command || modifiers.ctrl,
                    set_downbeat: modifiers.alt,
                },
            );
        }

        if self.pressing {
            if released {
                self.pressing = false;
                session.pointer_up(content);
            } else {
                session.pointer_drag(content);
            }
        }
    }

    fn draw_rows(
        &self,
        painter: &egui::Painter,
        rect: egui::Rect,
        layout: &RollLayout,
        origin: egui::Pos2,
    ) {
        for pitch in layout.range.min..=layout.range.max {
            let y = origin.y + layout.row_top(pitch);
            if y > rect.bottom() || y + layout.row_height < rect.top() {
                continue;
            }
            if is_black_key(pitch) {
                let row = egui::Rect::from_min_size(
                    egui::pos2(rect.left(), y),
                    egui::vec2(rect.width(), layout.row_height),
                );
                painter.rect_filled(row, 0.0, COLOR_ROW_BLACK_KEY);
            }
            let color = if pitch % 12 == 0 {
                egui::Color32::from_gray(50)
            } else {
                egui::Color32::from_gray(30)
            };
            let bottom = y + layout.row_height;
            painter.line_segment(
                [egui::pos2(rect.left(), bottom), egui::pos2(rect.right(), bottom)],
                egui::Stroke::new(1.0, color),
            );
        }
    }

    fn draw_grid(
        &self,
        painter: &egui::Painter,
        rect: egui::Rect,
        session: &EditorSession,
        layout: &RollLayout,
        origin: egui::Pos2,
    ) {
        let bottom = (origin.y + layout.content_height()).min(rect.bottom());
        let from = layout.x_to_time(rect.left() - origin.x);
        let to = layout.x_to_time(rect.right() - origin.x);
        for line in session.grid_lines(from, to) {
            let x = origin.x + layout.time_to_x(line.time);
            let (width, color) = match line.kind {
                GridLineKind::Bar => (1.5, COLOR_GRID_BAR),
                GridLineKind::Beat => (1.0, COLOR_GRID_BEAT),
                GridLineKind::Subdivision => (1.0, COLOR_GRID_SUBDIVISION),
            };
            painter.line_segment(
                [egui::pos2(x, rect.top()), egui::pos2(x, bottom)],
                egui::Stroke::new(width, color),
            );
        }
    }

    fn draw_notes(
        &self,
        painter: &egui::Painter,
        rect: egui::Rect,
        session: &EditorSession,
        layout: &RollLayout,
        origin: egui::Pos2,
    ) {
        let now = session.current_time();
        let active = session.active_pitches();
        for note in session.notes() {
            let note_rect = layout.note_rect(note).translate(origin.to_vec2());
            if !note_rect.intersects(rect) {
                continue;
            }
            let fill = if session.selection().contains(note.id) {
                COLOR_NOTE_SELECTED
            } else if active.contains(&note.pitch) && note.is_active_at(now) {
                COLOR_NOTE_ACTIVE
            } else {
                COLOR_NOTE
            };
            painter.rect_filled(note_rect, 2.0, fill);
            painter.rect_stroke(
                note_rect,
                2.0,
                egui::Stroke::new(1.0, egui::Color32::from_black_alpha(120)),
                egui::StrokeKind::Inside,
            );
        }
    }
}

fn draw_keyboard(
    painter: &egui::Painter,
    rect: egui::Rect,
    layout: &RollLayout,
    active: &BTreeSet<u8>,
    origin_y: f32,
) {
    painter.rect_filled(rect, 0.0, egui::Color32::from_gray(40));

    for pitch in layout.range.min..=layout.range.max {
        let y = origin_y + layout.row_top(pitch);
        if y > rect.bottom() || y + layout.row_height < rect.top() {
            continue;
        }
        let black = is_black_key(pitch);
        let width = if black { rect.width() * 0.65 } else { rect.width() };
        let key_rect = egui::Rect::from_min_size(
            egui::pos2(rect.left(), y),
            egui::vec2(width, layout.row_height),
        );

        let fill = if active.contains(&pitch) {
            COLOR_NOTE_ACTIVE
        } else if black {
            egui::Color32::from_gray(30)
        } else {
            egui::Color32::from_gray(225)
        };
        painter.rect_filled(key_rect, 0.0, fill);
        painter.rect_stroke(
            key_rect,
            0.0,
            egui::Stroke::new(1.0, egui::Color32::GRAY),
            egui::StrokeKind::Inside,
        );

        if pitch % 12 == 0 && layout.row_height >= 9.0 {
            painter.text(
                egui::pos2(rect.right() - 3.0, key_rect.center().y),
                egui::Align2::RIGHT_CENTER,
                format!("C{}", pitch as i32 / 12 - 1),
                egui::FontId::proportional((layout.row_height - 2.0).min(12.0)),
                egui::Color32::BLACK,
            );
        }
    }
}
