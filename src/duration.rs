//! Parsing of `ps`-style elapsed and CPU time strings.
//!
//! The `time` and `etime` columns use the format `[[dd-]hh:]mm:ss[.ff]`,
//! loosely defined by ps(1). The day prefix may also appear directly in
//! front of `mm:ss` (e.g. `01-01:01`).

/// Parses a `[[dd-]hh:]mm:ss[.ff]` duration into fractional seconds.
///
/// Malformed input yields `0.0` rather than an error. The values come from
/// kernel or `ps` output, and one garbled field should not abort a whole
/// capture.
pub fn parse_duration(text: &str) -> f64 {
    let text = text.trim();

    let (days, rest) = match text.split_once('-') {
        Some((days, rest)) => match days.parse::<u64>() {
            Ok(days) => (days, rest),
            Err(_) => return 0.0,
        },
        None => (0, text),
    };

    let parts: Vec<&str> = rest.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [hours, minutes, seconds] => (parse_field(hours), parse_field(minutes), parse_seconds(seconds)),
        [minutes, seconds] => (Some(0), parse_field(minutes), parse_seconds(seconds)),
        _ => return 0.0,
    };

    match (hours, minutes, seconds) {
        (Some(hours), Some(minutes), Some(seconds)) => {
            (days * 86400 + hours * 3600 + minutes * 60) as f64 + seconds
        }
        _ => 0.0,
    }
}

fn parse_field(value: &str) -> Option<u64> {
    value.parse().ok()
}

/// The seconds field is digits with an optional 1-2 digit fraction. A bare
/// float parse would also accept exponents, signs, and infinities, which the
/// column format never produces.
fn parse_seconds(value: &str) -> Option<f64> {
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (value, None),
    };

    if whole.is_empty() || !whole.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    if let Some(fraction) = fraction {
        if fraction.is_empty()
            || fraction.len() > 2
            || !fraction.bytes().all(|byte| byte.is_ascii_digit())
        {
            return None;
        }
    }

    value.parse().ok()
}
