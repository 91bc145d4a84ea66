//! Prompt template engine: `{{path}}` substitution from a JSON context.
//!
//! Paths may be flat keys (`{{title}}`), dotted (`{{abstract.field}}`), or
//! array-indexed at any segment (`{{claims.elements[0].function}}`), which is
//! how one phase's structured output is spliced value-by-value into the next
//! phase's free-text prompt. A path that does not resolve leaves its token
//! verbatim in the output; that is deliberate, not an error.

use serde_json::Value;

/// Fill every `{{path}}` token in `template` from `ctx` (a JSON object).
///
/// String values are inserted raw; objects, arrays and scalars are inserted
/// as their canonical JSON text.
pub fn fill(template: &str, ctx: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let path = after[..end].trim();
                match resolve(ctx, path) {
                    Some(value) => out.push_str(&render(value)),
                    // Unresolved path: keep the token verbatim.
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                // Unterminated token: emit the remainder as-is.
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Walk a dotted, optionally array-indexed path into a JSON value.
fn resolve<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = ctx;
    for segment in path.split('.') {
        let (key, indices) = parse_segment(segment)?;
        if !key.is_empty() {
            current = current.get(key)?;
        }
        for idx in indices {
            current = current.get(idx)?;
        }
    }
    Some(current)
}

/// Split `name[0][2]` into `("name", [0, 2])`. Returns None on malformed
/// index syntax so the token stays verbatim.
fn parse_segment(segment: &str) -> Option<(&str, Vec<usize>)> {
    match segment.find('[') {
        None => Some((segment, Vec::new())),
        Some(bracket) => {
            let key = &segment[..bracket];
            let mut indices = Vec::new();
            let mut rest = &segment[bracket..];
            while let Some(stripped) = rest.strip_prefix('[') {
                let close = stripped.find(']')?;
                indices.push(stripped[..close].parse().ok()?);
                rest = &stripped[close + 1..];
            }
            if rest.is_empty() {
                Some((key, indices))
            } else {
                None
            }
        }
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
