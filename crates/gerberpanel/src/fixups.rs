//! Text-level repairs applied to emitted panel files.

use tracing::debug;

use crate::capture;

/// Moves every routing block of a drill file behind the plain hits.
///
/// The header up to `%` stays first. A routing block starts at the first
/// `G00`–`G03` of a tool section (or a stray `M15`) and runs through the
/// closing `G05`; it is re-emitted after all hits, preceded by its tool
/// select. `M30` always ends the file. Text without a header terminator is
/// returned unchanged.
pub fn reorder_drill_routing(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let Some(header_end) = lines.iter().position(|l| *l == "%" || *l == "M95") else {
        return text.to_string();
    };
    let (header, body) = lines.split_at(header_end + 1);

    let mut hits: Vec<&str> = Vec::new();
    let mut tail: Vec<&str> = Vec::new();
    let mut tool: Option<&str> = None;
    let mut tool_emitted = false;
    let mut routing = false;
    let mut blocks = 0usize;

    for line in body.iter().copied() {
        if line.is_empty() || line == "M30" {
            continue;
        }
        if capture(regex!(r"^T\d+$"), line).is_some() {
            routing = false;
            tool = Some(line);
            tool_emitted = false;
            continue;
        }
        if !routing && (capture(regex!(r"^G0[0-3]"), line).is_some() || line == "M15") {
            routing = true;
            blocks += 1;
            if let Some(t) = tool {
                tail.push(t);
            }
        }
        if routing {
            tail.push(line);
            if line == "G05" {
                routing = false;
            }
            continue;
        }
        if !tool_emitted {
            if let Some(t) = tool {
                hits.push(t);
            }
            tool_emitted = true;
        }
        hits.push(line);
    }

    debug!(blocks, "reordered drill routing");
    let mut out = String::with_capacity(text.len() + 16);
    for line in header.iter().chain(&hits).chain(&tail) {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("M30\n");
    out
}

/// Makes a Gerber file end with `%LPD*%` then `M02*`.
pub fn ensure_silk_polarity(text: &str) -> String {
    let mut body = text.trim_end();
    if let Some(stripped) = body.strip_suffix("M02*") {
        body = stripped.trim_end();
    }
    let mut out = String::with_capacity(body.len() + 16);
    out.push_str(body);
    if !body.ends_with("%LPD*%") {
        out.push_str("\n%LPD*%");
    }
    out.push_str("\nM02*\n");
    out
}
