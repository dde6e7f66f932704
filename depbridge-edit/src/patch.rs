//! Marker-guarded text patches.
//!
//! Every applied body is wrapped in a begin/end marker pair carrying the patch
//! id, so a second application can tell "already there" from "something else
//! is there" instead of inserting the block twice.

use crate::error::PatchError;
use depbridge_types::patch::{PatchKind, PatchSpec};

const BEGIN: &str = "# >>> depbridge:";
const END: &str = "# <<< depbridge:";

pub fn begin_marker(id: &str) -> String {
    format!("{BEGIN}{id}")
}

pub fn end_marker(id: &str) -> String {
    format!("{END}{id}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied(String),
    /// The marker block is present with an identical body.
    AlreadyApplied,
}

#[derive(Debug, Clone, Copy)]
struct Block<'a> {
    id: &'a str,
    start: usize,
    /// Index of the end-marker line.
    end: usize,
}

impl Block<'_> {
    fn contains(&self, line: usize) -> bool {
        (self.start..=self.end).contains(&line)
    }
}

/// Apply one patch to `content`.
///
/// The anchor is matched as an exact substring on a single line and must occur
/// exactly once outside existing marker blocks. The inserted block takes the
/// anchor line's indentation.
pub fn apply_patch_to_content(content: &str, patch: &PatchSpec) -> Result<PatchOutcome, PatchError> {
    let newline = if content.contains("\r\n") { "\r\n" } else { "\n" };
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let blocks = find_blocks(&lines, patch)?;

    if let Some(block) = blocks.iter().find(|b| b.id == patch.id) {
        let indent = leading_whitespace(lines[block.start]);
        let expected = indented_body(&patch.body, indent);
        let existing = lines[block.start + 1..block.end].iter().map(|l| strip_eol(l));
        return if expected.iter().map(String::as_str).eq(existing) {
            Ok(PatchOutcome::AlreadyApplied)
        } else {
            Err(PatchError::Drifted {
                id: patch.id.clone(),
                path: patch.path.clone(),
            })
        };
    }

    let mut hits = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if blocks.iter().any(|b| b.contains(i)) {
            continue;
        }
        hits.extend(line.matches(patch.anchor.as_str()).map(|_| i));
    }
    let at = match hits.as_slice() {
        [] => {
            return Err(PatchError::AnchorNotFound {
                id: patch.id.clone(),
                path: patch.path.clone(),
                anchor: patch.anchor.clone(),
            });
        }
        [at] => *at,
        _ => {
            return Err(PatchError::AmbiguousAnchor {
                id: patch.id.clone(),
                path: patch.path.clone(),
                anchor: patch.anchor.clone(),
                count: hits.len(),
            });
        }
    };

    let indent = leading_whitespace(lines[at]);
    let mut block = Vec::new();
    block.push(format!("{indent}{}", begin_marker(&patch.id)));
    block.extend(indented_body(&patch.body, indent));
    block.push(format!("{indent}{}", end_marker(&patch.id)));

    // Blocks already placed after the same anchor stay ahead of this one.
    let insert_at = match patch.kind {
        PatchKind::InsertAfter => {
            let mut pos = at + 1;
            while let Some(b) = blocks.iter().find(|b| b.start == pos) {
                pos = b.end + 1;
            }
            pos
        }
        PatchKind::ReplaceLine => at,
    };

    let mut out = String::with_capacity(content.len() + patch.body.len() + 64);
    for (i, line) in lines.iter().enumerate() {
        if i == insert_at {
            push_block(&mut out, &block, newline);
        }
        if patch.kind == PatchKind::ReplaceLine && i == at {
            continue;
        }
        out.push_str(line);
    }
    if insert_at >= lines.len() {
        push_block(&mut out, &block, newline);
    }

    Ok(PatchOutcome::Applied(out))
}

fn find_blocks<'a>(lines: &[&'a str], patch: &PatchSpec) -> Result<Vec<Block<'a>>, PatchError> {
    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let Some(id) = lines[i].trim().strip_prefix(BEGIN) else {
            i += 1;
            continue;
        };
        let id = id.trim();
        let end = end_marker(id);
        let Some(offset) = lines[i + 1..].iter().position(|l| l.trim() == end) else {
            return Err(PatchError::UnterminatedBlock {
                block: id.to_string(),
                path: patch.path.clone(),
            });
        };
        let end_idx = i + 1 + offset;
        blocks.push(Block {
            id,
            start: i,
            end: end_idx,
        });
        i = end_idx + 1;
    }
    Ok(blocks)
}

fn push_block(out: &mut String, block: &[String], newline: &str) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(newline);
    }
    for line in block {
        out.push_str(line);
        out.push_str(newline);
    }
}

fn indented_body(body: &str, indent: &str) -> Vec<String> {
    body.lines()
        .map(|l| {
            if l.is_empty() {
                String::new()
            } else {
                format!("{indent}{l}")
            }
        })
        .collect()
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

fn strip_eol(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}
