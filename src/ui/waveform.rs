use crate::config::WaveformConfig;
use crate::waveform::WaveformPeaks;
use eframe::egui;

fn color((r, g, b): (u8, u8, u8)) -> egui::Color32 {
    egui::Color32::from_rgb(r, g, b)
}

/// Bar-style waveform in the same horizontal coordinates as the roll.
///
/// `scroll_left` and `pixels_per_second` come from the session, so a bar at
/// screen x covers exactly the seconds a note drawn at x would.
pub fn draw_waveform(
    painter: &egui::Painter,
    rect: egui::Rect,
    peaks: Option<&WaveformPeaks>,
    config: &WaveformConfig,
    pixels_per_second: f32,
    scroll_left: f32,
    playhead_x: f32,
) {
    painter.rect_filled(rect, 2.0, egui::Color32::from_gray(30));

    let Some(peaks) = peaks else {
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "No audio loaded",
            egui::FontId::proportional(13.0),
            egui::Color32::from_gray(120),
        );
        return;
    };

    let center_y = rect.center().y;
    let half_height = rect.height() * 0.45;
    let pitch = (config.bar_width + config.bar_gap).max(1.0);
    let pps = pixels_per_second.max(f32::EPSILON) as f64;

    let mut x = 0.0f32;
    while x < rect.width() {
        let content_x = scroll_left + x;
        let start = content_x as f64 / pps;
        let end = (content_x + pitch) as f64 / pps;
        let Some((lo, hi)) = peaks.range(start, end) else {
            break;
        };

        let fill = if content_x < playhead_x {
            color(config.progress_color)
        } else {
            color(config.wave_color)
        };
        let bar = egui::Rect::from_min_max(
            egui::pos2(rect.left() + x, center_y - hi.clamp(0.0, 1.0) * half_height),
            egui::pos2(
                rect.left() + x + config.bar_width.max(1.0),
                center_y - lo.clamp(-1.0, 0.0) * half_height + 1.0,
            ),
        );
        painter.rect_filled(bar, 0.0, fill);
        x += pitch;
    }

    let playhead = rect.left() + playhead_x - scroll_left;
    if playhead >= rect.left() && playhead <= rect.right() {
        painter.line_segment(
            [
                egui::pos2(playhead, rect.top()),
                egui::pos2(playhead, rect.bottom()),
            ],
            egui::Stroke::new(2.0, crate::constants::COLOR_PLAYHEAD),
        );
    }
}
