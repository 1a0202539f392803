//! MusicXML (partwise) export of the note sequence.
//!
//! The score is one "Piano" part in 4/4. Bars are laid out from the downbeat
//! offset with the session tempo, so the score lines up with the grid drawn on
//! the roll. Notes crossing a barline are split and tied.

use std::path::Path;

use crate::constants::{BEATS_PER_BAR, CHORD_TOLERANCE_SECONDS, MUSICXML_DIVISIONS};
use crate::model::{GridParams, Note};
use crate::notation::Spelling;

const MEASURE_DIVISIONS: i64 = MUSICXML_DIVISIONS as i64 * BEATS_PER_BAR as i64;

/// Part of a note that falls inside one measure.
#[derive(Debug, Clone, Copy)]
struct Piece {
    pitch: u8,
    start_seconds: f64,
    start: i64,
    duration: i64,
    tie_stop: bool,
    tie_start: bool,
}

struct MeasureClock {
    offset: f64,
    seconds_per_beat: f64,
    measure_seconds: f64,
}

impl MeasureClock {
    fn new(grid: &GridParams) -> Self {
        let seconds_per_beat = grid.seconds_per_beat();
        Self {
            offset: grid.offset,
            seconds_per_beat,
            measure_seconds: seconds_per_beat * BEATS_PER_BAR,
        }
    }

    fn measure_index(&self, seconds: f64) -> i64 {
        ((seconds - self.offset) / self.measure_seconds).floor() as i64
    }

    fn measure_start(&self, index: i64) -> f64 {
        self.offset + index as f64 * self.measure_seconds
    }

    /// Divisions from the start of measure `index` to `seconds`.
    fn divisions_into(&self, index: i64, seconds: f64) -> i64 {
        let beats = (seconds - self.measure_start(index)) / self.seconds_per_beat;
        ((beats * MUSICXML_DIVISIONS as f64).round() as i64).clamp(0, MEASURE_DIVISIONS)
    }
}

pub fn export(notes: &[Note], grid: &GridParams) -> String {
    let clock = MeasureClock::new(grid);
    let mut sorted: Vec<&Note> = notes.iter().filter(|n| n.duration > 0.0).collect();
    sorted.sort_by(|a, b| {
        a.start_time
            .total_cmp(&b.start_time)
            .then(a.pitch.cmp(&b.pitch))
    });

    let first_measure = sorted
        .iter()
        .map(|n| clock.measure_index(n.start_time))
        .min()
        .unwrap_or(0)
        .min(0);
    let last_measure = sorted
        .iter()
        .map(|n| clock.measure_index(n.end_time() - 1e-9))
        .max()
        .unwrap_or(0)
        .max(first_measure);

    let mut measures: Vec<Vec<Piece>> =
        vec![Vec::new(); (last_measure - first_measure + 1) as usize];
    for note in &sorted {
        split_into_measures(note, &clock, first_measure, &mut measures);
    }

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n");
    out.push_str(
        "<!DOCTYPE score-partwise PUBLIC \"-//Recordare//DTD MusicXML 4.0 Partwise//EN\" \
         \"http://www.musicxml.org/dtds/partwise.dtd\">\n",
    );
    out.push_str("<score-partwise version=\"4.0\">\n");
    out.push_str("  <part-list>\n");
    out.push_str("    <score-part id=\"P1\">\n");
    out.push_str("      <part-name>Piano</part-name>\n");
    out.push_str("    </score-part>\n");
    out.push_str("  </part-list>\n");
    out.push_str("  <part id=\"P1\">\n");

    for (i, pieces) in measures.iter_mut().enumerate() {
        out.push_str(&format!("    <measure number=\"{}\">\n", i + 1));
        if i == 0 {
            write_attributes(&mut out, grid.tempo);
        }
        write_measure_body(&mut out, pieces);
        out.push_str("    </measure>\n");
    }

    out.push_str("  </part>\n");
    out.push_str("</score-partwise>\n");
    out
}

pub fn export_to_file(notes: &[Note], grid: &GridParams, path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, export(notes, grid))?;
    log::info!("exported MusicXML to {}", path.display());
    Ok(())
}

fn split_into_measures(note: &Note, clock: &MeasureClock, first: i64, measures: &mut [Vec<Piece>]) {
    let end = note.end_time();
    let mut index = clock.measure_index(note.start_time);
    let mut piece_start = note.start_time;
    loop {
        let measure_end = clock.measure_start(index + 1);
        let piece_end = end.min(measure_end);
        let start = clock.divisions_into(index, piece_start).min(MEASURE_DIVISIONS - 1);
        let stop = clock.divisions_into(index, piece_end);
        let continues = end > measure_end + 1e-9;
        if let Some(pieces) = measures.get_mut((index - first) as usize) {
            pieces.push(Piece {
                pitch: note.pitch,
                start_seconds: piece_start,
                start,
                duration: (stop - start).max(1),
                tie_stop: piece_start > note.start_time,
                tie_start: continues,
            });
        }
        if !continues {
            break;
        }
        index += 1;
        piece_start = measure_end;
    }
}

fn write_attributes(out: &mut String, tempo: f64) {
    out.push_str("      <attributes>\n");
    out.push_str(&format!("        <divisions>{}</divisions>\n", MUSICXML_DIVISIONS));
    out.push_str("        <key><fifths>0</fifths></key>\n");
    out.push_str("        <time><beats>4</beats><beat-type>4</beat-type></time>\n");
    out.push_str("        <clef><sign>G</sign><line>2</line></clef>\n");
    out.push_str("      </attributes>\n");
    out.push_str("      <direction placement=\"above\">\n");
    out.push_str("        <direction-type>\n");
    out.push_str(&format!(
        "          <metronome><beat-unit>quarter</beat-unit><per-minute>{}</per-minute></metronome>\n",
        tempo.round()
    ));
    out.push_str("        </direction-type>\n");
    out.push_str(&format!("        <sound tempo=\"{}\"/>\n", tempo));
    out.push_str("      </direction>\n");
}

fn write_measure_body(out: &mut String, pieces: &mut [Piece]) {
    if pieces.is_empty() {
        out.push_str("      <note>\n");
        out.push_str("        <rest measure=\"yes\"/>\n");
        out.push_str(&format!("        <duration>{}</duration>\n", MEASURE_DIVISIONS));
        out.push_str("        <voice>1</voice>\n");
        out.push_str("      </note>\n");
        return;
    }

    pieces.sort_by(|a, b| a.start.cmp(&b.start).then(a.pitch.cmp(&b.pitch)));

    let mut cursor: i64 = 0;
    let mut reached: i64 = 0;
    let mut i = 0;
    while i < pieces.len() {
        // Everything starting within the tolerance of the first piece sounds
        // as one chord at its position.
        let lead = pieces[i];
        let mut chord_end = i + 1;
        while chord_end < pieces.len()
            && (pieces[chord_end].start_seconds - lead.start_seconds).abs()
                <= CHORD_TOLERANCE_SECONDS
        {
            chord_end += 1;
        }

        if lead.start > cursor {
            write_rest(out, lead.start - cursor);
        } else if lead.start < cursor {
            out.push_str(&format!(
                "      <backup><duration>{}</duration></backup>\n",
                cursor - lead.start
            ));
        }

        for (k, piece) in pieces[i..chord_end].iter().enumerate() {
            write_note(out, piece, k > 0);
        }
        cursor = lead.start + lead.duration;
        reached = reached.max(cursor);
        i = chord_end;
    }

    if cursor < reached {
        out.push_str(&format!(
            "      <forward><duration>{}</duration></forward>\n",
            reached - cursor
        ));
    }
    if reached < MEASURE_DIVISIONS {
        write_rest(out, MEASURE_DIVISIONS - reached);
    }
}

fn write_note(out: &mut String, piece: &Piece, in_chord: bool) {
    let spelling = Spelling::of(piece.pitch);
    out.push_str("      <note>\n");
    if in_chord {
        out.push_str("        <chord/>\n");
    }
    out.push_str("        <pitch>\n");
    out.push_str(&format!("          <step>{}</step>\n", spelling.step_name()));
    if spelling.sharp {
        out.push_str("          <alter>1</alter>\n");
    }
    out.push_str(&format!("          <octave>{}</octave>\n", spelling.octave));
    out.push_str("        </pitch>\n");
    out.push_str(&format!("        <duration>{}</duration>\n", piece.duration));
    if piece.tie_stop {
        out.push_str("        <tie type=\"stop\"/>\n");
    }
    if piece.tie_start {
        out.push_str("        <tie type=\"start\"/>\n");
    }
    out.push_str("        <voice>1</voice>\n");
    write_type(out, piece.duration);
    if piece.tie_stop || piece.tie_start {
        out.push_str("        <notations>\n");
        if piece.tie_stop {
            out.push_str("          <tied type=\"stop\"/>\n");
        }
        if piece.tie_start {
            out.push_str("          <tied type=\"start\"/>\n");
        }
        out.push_str("        </notations>\n");
    }
    out.push_str("      </note>\n");
}

fn write_rest(out: &mut String, duration: i64) {
    out.push_str("      <note>\n");
    out.push_str("        <rest/>\n");
    out.push_str(&format!("        <duration>{}</duration>\n", duration));
    out.push_str("        <voice>1</voice>\n");
    write_type(out, duration);
    out.push_str("      </note>\n");
}

/// Closest notated value not longer than `duration`, dotted when it matches
/// exactly.
fn note_type(duration: i64) -> (&'static str, bool) {
    const TYPES: [(&str, i64); 7] = [
        ("whole", 1920),
        ("half", 960),
        ("quarter", 480),
        ("eighth", 240),
        ("16th", 120),
        ("32nd", 60),
        ("64th", 30),
    ];
    for (name, length) in TYPES {
        if duration >= length {
            return (name, duration == length * 3 / 2);
        }
    }
    ("128th", false)
}

fn write_type(out: &mut String, duration: i64) {
    let (name, dotted) = note_type(duration);
    out.push_str(&format!("        <type>{}</type>\n", name));
    if dotted {
        out.push_str("        <dot/>\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Subdivision;

    fn grid(offset: f64) -> GridParams {
        GridParams::new(120.0, offset, Subdivision::Quarter)
    }

    fn measures(xml: &str) -> Vec<&str> {
        xml.split("<measure ").skip(1).collect()
    }

    #[test]
    fn empty_score_is_one_measure_rest() {
        let xml = export(&[], &grid(0.0));
        let bars = measures(&xml);
        assert_eq!(bars.len(), 1);
        assert!(bars[0].contains("<rest measure=\"yes\"/>"));
        assert!(bars[0].contains("<duration>1920</duration>"));
        assert!(xml.contains("<divisions>480</divisions>"));
        assert!(xml.contains("<part-name>Piano</part-name>"));
    }

    #[test]
    fn near_simultaneous_notes_form_a_chord() {
        let notes = [
            Note::new(60, 0.0, 0.5),
            Note::new(64, 0.0005, 0.5),
            Note::new(67, 1.0, 0.5),
        ];
        let xml = export(&notes, &grid(0.0));
        let bars = measures(&xml);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].matches("<chord/>").count(), 1);
        // gap between the chord and the G, then the tail of the bar
        assert_eq!(bars[0].matches("<rest/>").count(), 2);
        let chord_pos = bars[0].find("<chord/>").unwrap();
        let e_pos = bars[0].find("<step>E</step>").unwrap();
        assert!(chord_pos < e_pos);
    }

    #[test]
    fn gap_measures_get_whole_rests() {
        let notes = [Note::new(60, 0.0, 0.5), Note::new(62, 4.5, 0.5)];
        let xml = export(&notes, &grid(0.0));
        let bars = measures(&xml);
        assert_eq!(bars.len(), 3);
        assert!(bars[1].contains("<rest measure=\"yes\"/>"));
        assert!(bars[2].starts_with("number=\"3\""));
    }

    #[test]
    fn pickup_before_downbeat_gets_its_own_measure() {
        let notes = [Note::new(60, 0.5, 0.5), Note::new(62, 1.0, 0.5)];
        let xml = export(&notes, &grid(1.0));
        let bars = measures(&xml);
        assert_eq!(bars.len(), 2);
        assert!(bars[0].starts_with("number=\"1\""));
        assert!(bars[0].contains("<step>C</step>"));
        assert!(bars[1].contains("<step>D</step>"));
    }

    #[test]
    fn notes_across_barlines_are_tied() {
        let notes = [Note::new(61, 1.5, 1.0)];
        let xml = export(&notes, &grid(0.0));
        let bars = measures(&xml);
        assert_eq!(bars.len(), 2);
        assert!(bars[0].contains("<tie type=\"start\"/>"));
        assert!(bars[0].contains("<alter>1</alter>"));
        assert!(bars[1].contains("<tie type=\"stop\"/>"));
        assert!(bars[1].contains("<duration>480</duration>"));
    }

    #[test]
    fn picks_note_types() {
        assert_eq!(note_type(1920), ("whole", false));
        assert_eq!(note_type(720), ("quarter", true));
        assert_eq!(note_type(600), ("quarter", false));
        assert_eq!(note_type(240), ("eighth", false));
        assert_eq!(note_type(1440), ("half", true));
    }
}
