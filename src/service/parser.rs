//! Robust parsing of free-text model responses
//!
//! Model replies are supposed to be a single JSON object but routinely arrive
//! wrapped in markdown fences, preceded by prose, truncated mid-structure, or
//! sprinkled with trailing commas, single quotes and bare keys. The repair
//! pipeline here applies deterministic text-level fixes in a fixed order and
//! reparses after each one. Repairs touch punctuation and bracket balance
//! only; field values are never rewritten.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Error type for response parsing
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParserError {
    #[error("malformed model response: {reason}")]
    MalformedResponse {
        reason: String,
        /// The response exactly as the model returned it
        original: String,
        /// The text of the final repair attempt
        last_attempt: String,
    },
}

fn malformed(reason: &str, original: &str, last_attempt: &str) -> ParserError {
    ParserError::MalformedResponse {
        reason: reason.to_string(),
        original: original.to_string(),
        last_attempt: last_attempt.to_string(),
    }
}

/// Recover a JSON value from raw model-response text.
///
/// Stages, applied in order until a parse succeeds:
/// 1. strip markdown code fences
/// 2. isolate the outermost object or array (drops surrounding prose)
/// 3. direct parse
/// 4. remove trailing commas before closing delimiters
/// 5. salvage truncation: drop any dangling partial token, then append the
///    minimal closing delimiters
/// 6. rewrite single-quoted strings and bare keys to double-quoted form
pub fn parse_structured(raw: &str) -> Result<Value, ParserError> {
    let stripped = strip_code_fences(raw);
    let candidate = match isolate_structure(&stripped) {
        Some(c) => c.to_string(),
        None => return Err(malformed("no JSON object or array found", raw, &stripped)),
    };

    if let Ok(v) = serde_json::from_str(&candidate) {
        return Ok(v);
    }

    let mut attempt = strip_trailing_commas(&candidate);
    if let Ok(v) = serde_json::from_str(&attempt) {
        return Ok(v);
    }

    if let Some(balanced) = balance_delimiters(&attempt) {
        if let Ok(v) = serde_json::from_str(&balanced) {
            return Ok(v);
        }
        attempt = balanced;
    }

    attempt = requote(&attempt);
    if let Ok(v) = serde_json::from_str(&attempt) {
        return Ok(v);
    }

    // Requoting can expose one more round of comma/balance problems.
    attempt = strip_trailing_commas(&attempt);
    if let Some(balanced) = balance_delimiters(&attempt) {
        attempt = balanced;
    }
    match serde_json::from_str(&attempt) {
        Ok(v) => Ok(v),
        Err(e) => Err(malformed(
            &format!("exhausted repair heuristics: {e}"),
            raw,
            &attempt,
        )),
    }
}

/// Parse raw model text directly into a typed structure.
///
/// A reply that parses as JSON but does not fit the target shape is still a
/// malformed response from the caller's point of view.
pub fn parse_as<T: DeserializeOwned>(raw: &str) -> Result<T, ParserError> {
    let value = parse_structured(raw)?;
    let attempt = value.to_string();
    serde_json::from_value(value)
        .map_err(|e| malformed(&format!("response does not match schema: {e}"), raw, &attempt))
}

/// Strip markdown code-fence delimiters, keeping the fenced body.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(open) = trimmed.find("```") {
        let after = &trimmed[open + 3..];
        // Skip an optional language tag on the fence line
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        let inner = match body.rfind("```") {
            Some(close) => &body[..close],
            // Unclosed fence, a common truncation shape
            None => body,
        };
        return inner.trim().to_string();
    }
    trimmed.to_string()
}

/// Locate the outermost `{...}` or `[...]` region, string-aware.
///
/// Returns the balanced region when one closes, or everything from the opener
/// to the end of the text when it never does (the truncated case, left for
/// `balance_delimiters` to repair). `None` when no opener exists at all.
fn isolate_structure(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let tail = &text[start..];
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;
    for (i, c) in tail.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match c {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&tail[..i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    Some(tail)
}

/// Remove commas that immediately precede a closing delimiter.
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escape = false;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            i += 1;
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if !(j < chars.len() && matches!(chars[j], '}' | ']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out
}

/// Repair a truncated structure by appending the minimal closing delimiters.
///
/// A dangling partial token at the cut point (unterminated string, key with
/// no value, half-written literal) is dropped first; everything complete
/// before the cut is preserved verbatim. Returns `None` when the text is
/// already balanced.
fn balance_delimiters(text: &str) -> Option<String> {
    let (stack, in_string, string_start) = scan_state(text);
    if stack.is_empty() && !in_string {
        return None;
    }

    let mut fixed = text.to_string();
    if in_string {
        // Closing the quote instead would admit a half-written key or value
        // as real data.
        fixed.truncate(string_start);
    }
    trim_dangling_tail(&mut fixed);

    let (stack, _, _) = scan_state(&fixed);
    for open in stack.iter().rev() {
        fixed.push(if *open == '{' { '}' } else { ']' });
    }
    Some(fixed)
}

/// Scan delimiter/string state: (open-delimiter stack, in-string flag, byte
/// offset of the unterminated string's opening quote).
fn scan_state(text: &str) -> (Vec<char>, bool, usize) {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escape = false;
    let mut string_start = 0usize;
    for (i, c) in text.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match c {
            '\\' if in_string => escape = true,
            '"' => {
                if !in_string {
                    string_start = i;
                }
                in_string = !in_string;
            }
            '{' | '[' if !in_string => stack.push(c),
            '}' | ']' if !in_string => {
                stack.pop();
            }
            _ => {}
        }
    }
    (stack, in_string, string_start)
}

/// Trim incomplete trailing syntax so appended closers produce valid JSON.
fn trim_dangling_tail(text: &mut String) {
    loop {
        while text.ends_with(|c: char| c.is_whitespace()) {
            text.pop();
        }
        if text.ends_with(',') {
            text.pop();
            continue;
        }
        if text.ends_with(':') {
            // A key with no value; the key string goes with it.
            text.pop();
            while text.ends_with(|c: char| c.is_whitespace()) {
                text.pop();
            }
            if text.ends_with('"')
                && let Some(start) = string_literal_start(text)
            {
                text.truncate(start);
            }
            continue;
        }
        if let Some(start) = trailing_bare_token(text) {
            let token = text[start..].to_string();
            if serde_json::from_str::<Value>(&token).is_err() {
                // Half-written literal such as `tru` or `12e`
                text.truncate(start);
                continue;
            }
        }
        break;
    }
}

/// Byte offset of the opening quote of the closed string literal the text
/// ends with. Quote and backslash are ASCII, so byte-wise backward scanning
/// is safe.
fn string_literal_start(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = bytes.len().checked_sub(2)?;
    loop {
        if bytes[i] == b'"' {
            let mut backslashes = 0;
            let mut j = i;
            while j > 0 && bytes[j - 1] == b'\\' {
                backslashes += 1;
                j -= 1;
            }
            if backslashes % 2 == 0 {
                return Some(i);
            }
        }
        if i == 0 {
            return None;
        }
        i -= 1;
    }
}

/// Start offset of a trailing bare token (number or keyword literal), if the
/// text ends with one.
fn trailing_bare_token(text: &str) -> Option<usize> {
    let mut start = text.len();
    for (i, c) in text.char_indices().rev() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-' | '_') {
            start = i;
        } else {
            break;
        }
    }
    (start < text.len()).then_some(start)
}

/// Rewrite single-quoted strings to double-quoted and quote bare object keys.
/// Content inside double-quoted strings is copied through untouched.
fn requote(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut last_significant = '\0';
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            out.push(c);
            i += 1;
            let mut escape = false;
            while i < chars.len() {
                let s = chars[i];
                out.push(s);
                i += 1;
                if escape {
                    escape = false;
                } else if s == '\\' {
                    escape = true;
                } else if s == '"' {
                    break;
                }
            }
            last_significant = '"';
            continue;
        }
        if c == '\'' {
            out.push('"');
            i += 1;
            let mut escape = false;
            let mut closed = false;
            while i < chars.len() {
                let s = chars[i];
                i += 1;
                if escape {
                    escape = false;
                    if s == '\'' {
                        out.push('\'');
                    } else {
                        out.push('\\');
                        out.push(s);
                    }
                    continue;
                }
                match s {
                    '\\' => escape = true,
                    '\'' => {
                        out.push('"');
                        closed = true;
                        break;
                    }
                    '"' => out.push_str("\\\""),
                    _ => out.push(s),
                }
            }
            // An unterminated single-quoted string stays open for the final
            // balancing pass to clean up.
            let _ = closed;
            last_significant = '"';
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            let mut j = i;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            let key_position = matches!(last_significant, '{' | ',');
            if key_position && j < chars.len() && chars[j] == ':' {
                out.push('"');
                out.push_str(&ident);
                out.push('"');
            } else {
                out.push_str(&ident);
            }
            last_significant = 'a';
            continue;
        }
        out.push(c);
        if !c.is_whitespace() {
            last_significant = c;
        }
        i += 1;
    }
    out
}
