use crate::notation::{Engraving, NoteHead};
use eframe::egui;

const STAFF_COLOR: egui::Color32 = egui::Color32::from_gray(170);
const HEAD_COLOR: egui::Color32 = egui::Color32::from_gray(235);

/// Grand staff showing the chord the engraver last produced.
pub fn draw_grand_staff(ui: &mut egui::Ui, engraving: &Engraving) {
    let (rect, _) = ui.allocate_exact_size(ui.available_size(), egui::Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 4.0, egui::Color32::from_gray(28));

    // Five lines per staff plus room for a few ledger lines on each side.
    let half_space = (rect.height() / 32.0).clamp(2.0, 6.0);
    let treble_middle = rect.center().y - half_space * 8.0;
    let bass_middle = rect.center().y + half_space * 8.0;
    let left = rect.left() + 12.0;
    let right = rect.right() - 12.0;
    let head_x = rect.center().x;

    for (middle, label, heads) in [
        (treble_middle, "Treble", &engraving.treble),
        (bass_middle, "Bass", &engraving.bass),
    ] {
        for step in (-4..=4).step_by(2) {
            let y = middle - step as f32 * half_space;
            painter.line_segment(
                [egui::pos2(left, y), egui::pos2(right, y)],
                egui::Stroke::new(1.0, STAFF_COLOR),
            );
        }
        painter.text(
            egui::pos2(left, middle - half_space * 5.0),
            egui::Align2::LEFT_BOTTOM,
            label,
            egui::FontId::proportional(11.0),
            STAFF_COLOR,
        );
        draw_chord(&painter, heads, head_x, middle, half_space);
    }

    // System bracket
    painter.line_segment(
        [
            egui::pos2(left, treble_middle - half_space * 4.0),
            egui::pos2(left, bass_middle + half_space * 4.0),
        ],
        egui::Stroke::new(2.0, STAFF_COLOR),
    );
}

fn draw_chord(painter: &egui::Painter, heads: &[NoteHead], x: f32, middle: f32, half_space: f32) {
    let radius = half_space * 0.95;
    let mut previous: Option<i32> = None;

    for head in heads {
        // Seconds collide; push the upper head to the other side of the stem.
        let x = match previous {
            Some(step) if head.staff_step - step == 1 => x + radius * 2.0,
            _ => x,
        };
        previous = Some(head.staff_step);
        let y = middle - head.staff_step as f32 * half_space;

        for ledger in head.ledger_lines() {
            let ly = middle - ledger as f32 * half_space;
            painter.line_segment(
                [egui::pos2(x - radius * 1.8, ly), egui::pos2(x + radius * 1.8, ly)],
                egui::Stroke::new(1.0, STAFF_COLOR),
            );
        }

        painter.circle_filled(egui::pos2(x, y), radius, HEAD_COLOR);
        if head.sharp {
            painter.text(
                egui::pos2(x - radius * 2.2, y),
                egui::Align2::RIGHT_CENTER,
                "#",
                egui::FontId::proportional(half_space * 3.0),
                HEAD_COLOR,
            );
        }
    }
}
