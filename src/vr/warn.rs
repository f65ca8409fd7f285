use crate::error::WarnCode;
use crate::vr::util::truncate_with_ellipsis;

const MAX_VALUE_CHARS: usize = 240;

pub struct WarnEvent<'a> {
    pub code: WarnCode,
    pub stage: &'a str,
    pub action: &'a str,
    pub item: &'a str,
    pub reason: &'a str,
    pub err: &'a str,
}

fn sanitize_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep = false;
    for ch in value.chars() {
        if ch.is_ascii_whitespace() {
            if !out.is_empty() && !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else if ch.is_ascii_graphic() {
            out.push(ch);
            prev_sep = false;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "na".to_string()
    } else {
        truncate_with_ellipsis(trimmed, MAX_VALUE_CHARS)
    }
}

pub fn format_line(event: &WarnEvent<'_>) -> String {
    format!(
        "VR_WARN code={} stage={} action={} item={} reason={} err={}",
        event.code.as_str(),
        sanitize_value(event.stage),
        sanitize_value(event.action),
        sanitize_value(event.item),
        sanitize_value(event.reason),
        sanitize_value(event.err),
    )
}

pub fn emit(event: WarnEvent<'_>) {
    eprintln!("{}", format_line(&event));
}
