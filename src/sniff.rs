//! Field separator detection for delimited text.
//!
//! The sniffer parses a short prefix of the file once per candidate separator and keeps
//! the one whose records agree most often on their field count. Messy input never makes
//! it fail: when no candidate splits the sample into at least two fields, the answer is
//! a comma.

use std::{fs::File, io::Read, path::Path};

use log::debug;

pub const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];
pub const DEFAULT_DELIMITER: u8 = b',';
pub const SAMPLE_CHARS: usize = 2048;

/// Bytes read from disk before trimming the sample down to [`SAMPLE_CHARS`] characters.
const SAMPLE_BYTES: usize = SAMPLE_CHARS * 4;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    delimiter: u8,
    /// Share of sampled records whose field count equals the modal count.
    consistency: f64,
    fields: usize,
}

/// Reads the head of `path` and sniffs its separator. Unreadable files yield the default.
pub fn detect_delimiter(path: &Path) -> u8 {
    match read_sample(path) {
        Ok(sample) => sniff_delimiter(&sample),
        Err(err) => {
            debug!("Could not sample {path:?} for delimiter detection: {err}");
            DEFAULT_DELIMITER
        }
    }
}

/// Picks the candidate separator with the most stable field count across `sample`.
pub fn sniff_delimiter(sample: &str) -> u8 {
    let sample = complete_lines(sample);
    let best = CANDIDATE_DELIMITERS
        .iter()
        .filter_map(|&delimiter| score(sample, delimiter))
        .fold(None::<Candidate>, |best, candidate| match best {
            Some(current)
                if current.consistency > candidate.consistency
                    || (current.consistency == candidate.consistency
                        && current.fields >= candidate.fields) =>
            {
                Some(current)
            }
            _ => Some(candidate),
        });
    match best {
        Some(candidate) => {
            debug!(
                "Sniffed delimiter '{}' ({} field(s), consistency {:.2})",
                crate::printable_delimiter(candidate.delimiter),
                candidate.fields,
                candidate.consistency
            );
            candidate.delimiter
        }
        None => DEFAULT_DELIMITER,
    }
}

fn read_sample(path: &Path) -> std::io::Result<String> {
    let mut buffer = Vec::with_capacity(SAMPLE_BYTES);
    File::open(path)?
        .take(SAMPLE_BYTES as u64)
        .read_to_end(&mut buffer)?;
    // Undecodable bytes are dropped rather than replaced, the sample only needs separators.
    let text = String::from_utf8_lossy(&buffer).replace('\u{FFFD}', "");
    Ok(text.chars().take(SAMPLE_CHARS).collect())
}

/// Drops a trailing partial line so a truncated sample does not skew the counts.
fn complete_lines(sample: &str) -> &str {
    match sample.rfind('\n') {
        Some(pos) if pos + 1 < sample.len() && sample[..pos].contains('\n') => &sample[..pos],
        _ => sample,
    }
}

fn score(sample: &str, delimiter: u8) -> Option<Candidate> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(sample.as_bytes());

    let mut counts = Vec::new();
    for record in reader.records() {
        let Ok(record) = record else {
            break;
        };
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }
        counts.push(record.len());
    }
    if counts.is_empty() {
        return None;
    }

    let mut tally: Vec<(usize, usize)> = Vec::new();
    for count in &counts {
        match tally.iter_mut().find(|(fields, _)| fields == count) {
            Some((_, hits)) => *hits += 1,
            None => tally.push((*count, 1)),
        }
    }
    let (fields, hits) = tally
        .into_iter()
        .max_by(|left, right| left.1.cmp(&right.1).then(left.0.cmp(&right.0)))?;
    if fields < 2 {
        return None;
    }
    Some(Candidate {
        delimiter,
        consistency: hits as f64 / counts.len() as f64,
        fields,
    })
}
