//! Line repair for text pulled out of uploads.
//!
//! Word-processor extraction mangles report lines in predictable ways: dash
//! glyphs split into backslash-dash pairs, runs of spaces and punctuation,
//! and lost commas between a movement direction and the unit it names. The
//! [`Normalizer`] undoes these with a fixed sequence of regex rewrites. It
//! never rejects input; a rewrite that does not match is a no-op.

use regex::bytes::Regex;

use crate::patterns::compile_bytes as compile;

/// Compiled rewrite patterns. Build once with [`Normalizer::new`] and reuse
/// for every line of every upload.
#[derive(Debug, Clone)]
pub struct Normalizer {
    backslash_dash: Regex,
    space_runs: Regex,
    space_before_punct: Regex,
    space_after_punct: Regex,
    backslash_unit: Regex,
    direction_unit: Regex,
    backslash_runs: Regex,
    comma_runs: Regex,
    comma_paren: Regex,
    unit_header: Regex,
    turn_marker: Regex,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            backslash_dash: compile(r"\\+ *-"),
            space_runs: compile(r" {2,}"),
            space_before_punct: compile(r" ([,()\\:])"),
            space_after_punct: compile(r"([,()\\:]) "),
            backslash_unit: compile(r"\\+(\d{4}(?:[cefg]\d)?)"),
            direction_unit: compile(r"(NE|SE|SW|NW|N|S) (\d{4}(?:[cefg]\d)?)"),
            backslash_runs: compile(r"\\{2,}"),
            comma_runs: compile(r",{2,}"),
            comma_paren: compile(r",\)"),
            unit_header: compile(r"^(?:Courier|Element|Fleet|Garrison|Tribe) \d{4}(?:[cefg]\d)?,"),
            turn_marker: compile(r" *\(#"),
        }
    }

    /// Normalize one line. Order matters: later rewrites assume the earlier
    /// ones already ran.
    pub fn normalize_line(&self, line: &[u8]) -> Vec<u8> {
        let line = self.backslash_dash.replace_all(line, &b"\\"[..]).into_owned();
        let line = self.space_runs.replace_all(&line, &b" "[..]).into_owned();
        let line = self
            .space_before_punct
            .replace_all(&line, &b"${1}"[..])
            .into_owned();
        let line = self
            .space_after_punct
            .replace_all(&line, &b"${1}"[..])
            .into_owned();
        // dropping the blank after a backslash can expose another `\-`
        let line = self.backslash_dash.replace_all(&line, &b"\\"[..]).into_owned();

        // a unit id glued to a backslash or to a bare direction lost its comma
        let line = self
            .backslash_unit
            .replace_all(&line, &b",${1}"[..])
            .into_owned();
        let line = self
            .direction_unit
            .replace_all(&line, &b"${1},${2}"[..])
            .into_owned();

        let line = self.backslash_runs.replace_all(&line, &b"\\"[..]).into_owned();
        let line = self.comma_runs.replace_all(&line, &b","[..]).into_owned();
        let mut line = self.comma_paren.replace_all(&line, &b")"[..]).into_owned();

        while line.last() == Some(&b'\\') {
            line.pop();
        }

        if let Some(header) = self.reinflate_header(&line) {
            line = header;
        }

        if line.starts_with(b"Current Turn ") {
            line = self
                .turn_marker
                .replace_all(&line, &b" (#"[..])
                .into_owned();
        }

        line
    }

    /// Collapsing commas removed the empty status field of a unit header;
    /// put it back so the header has four fields again.
    fn reinflate_header(&self, line: &[u8]) -> Option<Vec<u8>> {
        if !self.unit_header.is_match(line) {
            return None;
        }
        let fields: Vec<&[u8]> = line.split(|b| *b == b',').collect();
        if fields.len() != 3 || !fields[1].starts_with(b"Current Hex =") {
            return None;
        }
        let empty: &[u8] = b"";
        Some([fields[0], empty, fields[1], fields[2]].join(&b','))
    }

    /// Normalize every line, preserving order and count.
    pub fn normalize_lines<I>(&self, lines: I) -> Vec<Vec<u8>>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        lines
            .into_iter()
            .map(|line| self.normalize_line(line.as_ref()))
            .collect()
    }
}

/// Split raw upload text into lines: `\r\n` and lone `\r` end a line, and
/// leading spaces and tabs are trimmed from each line.
pub fn split_text_lines(data: &[u8]) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut current = Vec::new();
    let mut iter = data.iter().copied().peekable();
    while let Some(b) = iter.next() {
        match b {
            b'\r' => {
                if iter.peek() == Some(&b'\n') {
                    iter.next();
                }
                lines.push(std::mem::take(&mut current));
            }
            b'\n' => lines.push(std::mem::take(&mut current)),
            _ => current.push(b),
        }
    }
    lines.push(current);

    for line in lines.iter_mut() {
        let start = line
            .iter()
            .position(|b| !matches!(b, b' ' | b'\t'))
            .unwrap_or(line.len());
        line.drain(..start);
    }
    lines
}

/// Drop blank lines from both ends.
pub fn trim_blank_lines(mut lines: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|l| l.is_empty()).count();
    lines.drain(..leading);
    lines
}

/// Replace every run of invalid UTF-8 bytes with a single space.
pub fn replace_invalid_utf8(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len());
    let mut rest = data;
    let mut in_invalid_run = false;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                if !valid.is_empty() {
                    // valid_up_to guarantees this prefix is UTF-8
                    out.push_str(&String::from_utf8_lossy(valid));
                    in_invalid_run = false;
                }
                if !in_invalid_run {
                    out.push(' ');
                    in_invalid_run = true;
                }
                match e.error_len() {
                    Some(len) => rest = &after[len..],
                    None => return out,
                }
            }
        }
    }
}
