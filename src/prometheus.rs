// Parser for /actuator/prometheus exposition text.
// Lines: `name{label="value",...} number [timestamp]` or `name number [timestamp]`.
// Comments, blank lines and lines that do not parse are skipped.

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

/// Samples grouped by metric name, in input order within each name.
pub type Samples = BTreeMap<String, Vec<Sample>>;

pub fn parse(text: &str) -> Samples {
    let mut out = Samples::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((name, sample)) = parse_line(line) {
            out.entry(name.to_string()).or_default().push(sample);
        }
    }
    out
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

fn parse_line(line: &str) -> Option<(&str, Sample)> {
    let first = line.chars().next()?;
    if !is_name_start(first) {
        return None;
    }
    let name_end = line
        .char_indices()
        .find(|(_, c)| !is_name_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    let name = &line[..name_end];
    let rest = line[name_end..].trim_start();

    let (labels, rest) = if let Some(body) = rest.strip_prefix('{') {
        let (labels, consumed) = parse_labels(body)?;
        (labels, &body[consumed..])
    } else {
        (BTreeMap::new(), rest)
    };

    let value_token = rest.split_whitespace().next()?;
    let value = value_token.parse::<f64>().ok()?;
    Some((name, Sample { labels, value }))
}

/// Parse `k="v",k2="v2"}`; returns the labels and bytes consumed through the closing brace.
fn parse_labels(body: &str) -> Option<(BTreeMap<String, String>, usize)> {
    let bytes = body.as_bytes();
    let mut labels = BTreeMap::new();
    let mut i = 0;
    loop {
        while i < bytes.len() && (bytes[i] == b',' || bytes[i].is_ascii_whitespace()) {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        if bytes[i] == b'}' {
            return Some((labels, i + 1));
        }

        let key_start = i;
        while i < bytes.len() && bytes[i] != b'=' && bytes[i] != b'}' {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            return None;
        }
        let key = body[key_start..i].trim().to_string();
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'"' {
            return None;
        }
        i += 1;

        let mut value = String::new();
        loop {
            let c = *bytes.get(i)?;
            match c {
                b'"' => {
                    i += 1;
                    break;
                }
                b'\\' => {
                    let escaped = body.get(i + 1..)?.chars().next()?;
                    value.push(if escaped == 'n' { '\n' } else { escaped });
                    i += 1 + escaped.len_utf8();
                }
                _ => {
                    let ch = body[i..].chars().next()?;
                    value.push(ch);
                    i += ch.len_utf8();
                }
            }
        }
        labels.insert(key, value);
    }
}
