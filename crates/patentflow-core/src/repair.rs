//! Best-effort repair of near-valid JSON emitted by language models.
//!
//! Models asked for JSON routinely wrap it in code fences, leave a trailing
//! comma, or get cut off mid-object by a token limit. `parse` runs an
//! ordered list of small repair passes, each idempotent on already-valid
//! input, then attempts a strict parse with one truncate-and-rebalance
//! retry. Text that is already valid JSON always round-trips unchanged.

use serde_json::Value;

use crate::error::PipelineError;

/// Repair and parse model-emitted JSON.
pub fn parse(raw: &str) -> Result<Value, PipelineError> {
    // Valid input short-circuits: every repair pass is a no-op on it.
    if let Ok(v) = serde_json::from_str(raw.trim()) {
        return Ok(v);
    }

    let text = strip_code_fences(raw);
    let text = extract_object_span(&text);
    let text = strip_trailing_commas(&text);
    let text = close_unterminated_strings(&text);
    let text = balance_brackets(&text);

    if let Ok(v) = serde_json::from_str(&text) {
        return Ok(v);
    }

    // Last resort: drop the broken trailing member and retry exactly once.
    if let Some(truncated) = truncate_at_last_top_level_comma(&text) {
        let rebalanced = balance_brackets(&truncated);
        if let Ok(v) = serde_json::from_str(&rebalanced) {
            return Ok(v);
        }
    }

    Err(PipelineError::malformed_output(raw))
}

// ── Repair passes ────────────────────────────────────────────────────────

/// Drop surrounding ``` / ```json fence lines. Fences inside the text body
/// are left alone.
pub(crate) fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let mut lines: Vec<&str> = trimmed.lines().collect();
    if lines
        .first()
        .is_some_and(|l| l.trim_start().starts_with("```"))
    {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.trim() == "```") {
        lines.pop();
    }
    lines.join("\n").trim().to_string()
}

/// Extract the largest `{...}` span (first `{` through last `}`). Text with
/// no braces is returned unchanged.
pub(crate) fn extract_object_span(text: &str) -> String {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}

/// Remove commas that immediately precede a closing `}` or `]`, ignoring
/// commas inside string literals.
pub(crate) fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if matches!(next, Some('}') | Some(']')) {
                    continue;
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Close strings left unterminated at end of line: a line with an odd number
/// of unescaped quotes that does not already end with a quote gets one
/// appended.
pub(crate) fn close_unterminated_strings(text: &str) -> String {
    text.lines()
        .map(|line| {
            let quotes = count_unescaped_quotes(line);
            if quotes % 2 != 0 && !line.trim_end().ends_with('"') {
                let mut fixed = line.to_string();
                fixed.push('"');
                fixed
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn count_unescaped_quotes(line: &str) -> usize {
    let mut count = 0;
    let mut escaped = false;
    for c in line.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            count += 1;
        }
    }
    count
}

/// Append closers for every `{`/`[` still open at end of text, innermost
/// first. Brackets inside string literals are ignored.
pub(crate) fn balance_brackets(text: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&c) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    let mut out = text.to_string();
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}

/// Truncate just before the last comma at the outer object's nesting level,
/// dropping the member the model was cut off inside.
pub(crate) fn truncate_at_last_top_level_comma(text: &str) -> Option<String> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut last_comma = None;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => depth -= 1,
            ',' if depth == 1 => last_comma = Some(i),
            _ => {}
        }
    }

    last_comma.map(|i| text[..i].to_string())
}
