//! Key line selection.
//!
//! Picks the lyric lines that get illustrated: chorus content is always
//! kept, verses contribute their opening line, and the remaining lines are
//! sampled by length and position.

/// Maximum number of key lines (and therefore images) per project.
pub const MAX_KEY_LINES: usize = 8;

/// Below this many selections the result is backfilled from the top.
const MIN_KEY_LINES: usize = 5;

/// Lines longer than this tend to carry imagery.
const LONG_LINE_CHARS: usize = 20;

/// Every n-th line is sampled regardless of length.
const SAMPLE_STRIDE: usize = 5;

const CHORUS_MARKERS: [&str; 3] = ["chorus", "[chorus]", "refrain"];
const VERSE_MARKER: &str = "verse";

fn is_chorus_marker(line: &str) -> bool {
    let lower = line.to_lowercase();
    CHORUS_MARKERS.iter().any(|m| lower.contains(m))
}

fn is_verse_marker(line: &str) -> bool {
    line.to_lowercase().contains(VERSE_MARKER)
}

/// Select up to [`MAX_KEY_LINES`] lines to illustrate.
///
/// Total over all inputs: empty lyrics give an empty list, any lyrics with a
/// non-blank line give between 1 and 8 lines, and no two adjacent lines in
/// the result are identical once selection kicks in.
pub fn select_key_lines(lyrics: &str) -> Vec<String> {
    let lines: Vec<&str> = lyrics
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() <= MAX_KEY_LINES {
        return lines.into_iter().map(str::to_string).collect();
    }

    let last_index = lines.len() - 1;
    let mut selected: Vec<&str> = Vec::new();
    let mut in_chorus = false;

    for (i, &line) in lines.iter().enumerate() {
        if selected.last() == Some(&line) {
            continue;
        }

        if is_chorus_marker(line) {
            in_chorus = true;
            continue;
        }

        if is_verse_marker(line) {
            in_chorus = false;
            // The verse is represented by its opening line
            if let Some(&opening) = lines.get(i + 1) {
                if selected.last() != Some(&opening) {
                    selected.push(opening);
                }
            }
            continue;
        }

        if in_chorus {
            selected.push(line);
            continue;
        }

        if selected.len() < MAX_KEY_LINES
            && (line.chars().count() > LONG_LINE_CHARS
                || i == 0
                || i == last_index
                || i % SAMPLE_STRIDE == 0)
        {
            selected.push(line);
        }
    }

    if selected.len() < MIN_KEY_LINES && lines.len() > selected.len() {
        for &line in &lines {
            if selected.len() >= MAX_KEY_LINES {
                break;
            }
            if !selected.contains(&line) {
                selected.push(line);
            }
        }
    }

    selected.truncate(MAX_KEY_LINES);
    selected.into_iter().map(str::to_string).collect()
}
