//! Human-editable notesheet text.
//!
//! ```text
//! # comment
//! @1/2        relative time in beats, added to any rests before it
//! *2          duration in beats (optional, resets on every `@`)
//! 0101        lane mask, lane 0 first
//! ```

use crate::model::{NoteGroup, Song};
use crate::subdivision::{divisors, fraction_from_substeps, substeps_for};
use catneep_ports::types::{Difficulty, LaneMask, Substep, MAX_LANES};
use std::path::Path;

pub const NOTESHEET_TEXT_VERSION: &str = "0.4a";

const CHAR_COMMENT: char = '#';
const CHAR_TIME: char = '@';
const CHAR_DURATION: char = '*';
const CHAR_FRACTION: char = '/';
const CHAR_NOTE_TRUE: char = '1';
const CHAR_NOTE_FALSE: char = '0';

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum NotesheetTextError {
    #[error("unexpected character in line {line} ({character})")]
    UnexpectedCharacter { character: char, line: usize },
    #[error("no number found in line {line}")]
    MissingNumber { line: usize },
    #[error("number out of range in line {line}")]
    NumberOutOfRange { line: usize },
    #[error("io error: {0}")]
    Io(String),
}

pub fn import_notesheet_path(path: &Path) -> Result<Vec<NoteGroup>, NotesheetTextError> {
    let text = std::fs::read_to_string(path).map_err(|e| NotesheetTextError::Io(e.to_string()))?;
    import_notesheet_str(&text).inspect_err(|e| {
        log::warn!("notesheet import of {} failed: {}", path.display(), e);
    })
}

/// Parses a whole notesheet. Nothing is returned unless every line parses.
pub fn import_notesheet_str(text: &str) -> Result<Vec<NoteGroup>, NotesheetTextError> {
    let mut importer = TextImporter::default();
    for (index, line) in text.lines().enumerate() {
        importer.line = index + 1;
        let chars: Vec<char> = line.chars().collect();
        importer.read_line(&chars)?;
    }
    Ok(importer.groups)
}

#[derive(Default)]
struct TextImporter {
    line: usize,
    relative_time: Substep,
    duration: Substep,
    groups: Vec<NoteGroup>,
}

impl TextImporter {
    fn read_line(&mut self, chars: &[char]) -> Result<(), NotesheetTextError> {
        for (i, &c) in chars.iter().enumerate() {
            match c {
                CHAR_COMMENT => return Ok(()),
                ' ' => continue,
                CHAR_TIME => return self.read_relative_time(&chars[i + 1..]),
                CHAR_DURATION => return self.read_duration(&chars[i + 1..]),
                CHAR_NOTE_TRUE | CHAR_NOTE_FALSE => return self.read_notes(chars),
                other => return Err(self.unexpected(other)),
            }
        }
        Ok(())
    }

    fn read_relative_time(&mut self, chars: &[char]) -> Result<(), NotesheetTextError> {
        let mut i = 0;
        let time = self.read_time(chars, &mut i)?;
        self.relative_time = self.relative_time.saturating_add(time);
        self.duration = 0;

        while i < chars.len() {
            match chars[i] {
                CHAR_COMMENT => return Ok(()),
                ' ' => i += 1,
                CHAR_DURATION => return self.read_duration(&chars[i + 1..]),
                other => return Err(self.unexpected(other)),
            }
        }
        Ok(())
    }

    // Anything after the duration is ignored.
    fn read_duration(&mut self, chars: &[char]) -> Result<(), NotesheetTextError> {
        let mut i = 0;
        self.duration = self.read_time(chars, &mut i)?;
        Ok(())
    }

    /// Reads `a` or `a/b` beats and converts it to substeps.
    fn read_time(&self, chars: &[char], i: &mut usize) -> Result<Substep, NotesheetTextError> {
        let dividend = self.read_int(chars, i)?;
        let mut divisor = 1;
        if chars.get(*i) == Some(&CHAR_FRACTION) {
            *i += 1;
            divisor = self.read_int(chars, i)?;
        }
        Ok(substeps_for(divisor).saturating_mul(dividend))
    }

    fn read_int(&self, chars: &[char], i: &mut usize) -> Result<Substep, NotesheetTextError> {
        while chars.get(*i) == Some(&' ') {
            *i += 1;
        }
        let start = *i;
        while chars.get(*i).is_some_and(|c| c.is_ascii_digit()) {
            *i += 1;
        }
        if start == *i {
            return Err(NotesheetTextError::MissingNumber { line: self.line });
        }
        let digits: String = chars[start..*i].iter().collect();
        digits
            .parse()
            .map_err(|_| NotesheetTextError::NumberOutOfRange { line: self.line })
    }

    fn read_notes(&mut self, chars: &[char]) -> Result<(), NotesheetTextError> {
        // Two groups can't share a time: later lines at the same spot are dropped.
        if self.relative_time < 1 && !self.groups.is_empty() {
            return Ok(());
        }

        let mut lane: u32 = 0;
        let mut notes = LaneMask::EMPTY;
        for &c in chars {
            match c {
                // A comment anywhere on a lane line discards the line.
                CHAR_COMMENT => return Ok(()),
                ' ' => continue,
                CHAR_NOTE_TRUE => {
                    if lane < MAX_LANES as u32 {
                        notes.insert(lane as u8);
                    }
                    lane += 1;
                }
                CHAR_NOTE_FALSE => lane += 1,
                other => return Err(self.unexpected(other)),
            }
        }

        if !notes.is_empty() {
            self.groups
                .push(NoteGroup::new(notes, self.relative_time, self.duration));
            self.relative_time = 0;
            self.duration = 0;
        }
        Ok(())
    }

    fn unexpected(&self, character: char) -> NotesheetTextError {
        NotesheetTextError::UnexpectedCharacter {
            character,
            line: self.line,
        }
    }
}

pub fn export_notesheet_path(
    song: &Song,
    difficulty: Difficulty,
    lane_count: u8,
    path: &Path,
) -> Result<(), NotesheetTextError> {
    let text = export_notesheet_string(
        song.notesheet(difficulty).groups(),
        Some(&song.title),
        difficulty,
        lane_count,
    );
    std::fs::write(path, text).map_err(|e| NotesheetTextError::Io(e.to_string()))
}

pub fn export_notesheet_string(
    groups: &[NoteGroup],
    title: Option<&str>,
    difficulty: Difficulty,
    lane_count: u8,
) -> String {
    let mut text = String::new();
    for line in export_notesheet_lines(groups, title, difficulty, lane_count) {
        text.push_str(&line);
        text.push('\n');
    }
    text
}

pub fn export_notesheet_lines(
    groups: &[NoteGroup],
    title: Option<&str>,
    difficulty: Difficulty,
    lane_count: u8,
) -> Vec<String> {
    let valid_divisors = divisors()
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(" - ");

    let mut lines = vec![
        String::new(),
        format!("{CHAR_COMMENT} Notesheet text importer/exporter v{NOTESHEET_TEXT_VERSION}"),
        format!("{CHAR_COMMENT} Song: {}", title.unwrap_or("missing song.")),
        format!("{CHAR_COMMENT} Difficulty: {difficulty}"),
        format!("{CHAR_COMMENT} Warning: turn off line wrapping in your editor to read this file."),
        String::new(),
        format!("{CHAR_COMMENT} {CHAR_TIME} = Relative time in beats"),
        format!("{CHAR_COMMENT} {CHAR_DURATION} = Group duration in beats (0 by default)"),
        format!(
            "{CHAR_COMMENT} {f}{t}{f} = Notes in the group ({t} = note, {f} = no note)",
            f = CHAR_NOTE_FALSE,
            t = CHAR_NOTE_TRUE
        ),
        String::new(),
        format!("{CHAR_COMMENT} Beat times can be fractions. Ex: 1{CHAR_FRACTION}2"),
        format!("{CHAR_COMMENT} Valid divisors: {valid_divisors}"),
        String::new(),
    ];

    for group in groups {
        lines.push(String::new());
        lines.push(format!("{CHAR_TIME}{}", beat_time_fraction(group.relative_time())));
        if group.duration() > 0 {
            lines.push(format!("{CHAR_DURATION}{}", beat_time_fraction(group.duration())));
        }
        lines.push(group.notes().to_binary_text(lane_count));
    }

    lines
}

// A divisor of 1 is the importer default, so it is left out.
fn beat_time_fraction(substeps: Substep) -> String {
    let (dividend, divisor) = fraction_from_substeps(substeps);
    if divisor > 1 {
        format!("{dividend}{CHAR_FRACTION}{divisor}")
    } else {
        dividend.to_string()
    }
}
