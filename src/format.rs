use crate::api::EntryKind;
use chrono::{DateTime, NaiveDateTime, Utc};

const SIZE_UNITS: [&str; 8] = ["kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Format a byte count by repeated division by 1024, picking the unit at the
/// step where the magnitude lands at or below 1024, with a displayed floor of
/// 0.05 and one decimal place.
pub fn format_size(bytes: u64) -> String {
    let mut magnitude = bytes as f64 / 1024.0;
    let mut unit = 0;
    while magnitude > 1024.0 {
        magnitude /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", magnitude.max(0.05), SIZE_UNITS[unit])
}

/// Folders and zero-byte entries display no size.
pub fn format_entry_size(kind: EntryKind, bytes: u64) -> String {
    if kind == EntryKind::Folder || bytes == 0 {
        return String::new();
    }
    format_size(bytes)
}

/// Relative "time ago" rendering for a wire timestamp. Unparsable dates are
/// logged and rendered as nothing.
pub fn time_ago(raw: &str, now: DateTime<Utc>) -> Option<String> {
    match parse_timestamp(raw) {
        Some(when) => Some(humanize(now.signed_duration_since(when))),
        None => {
            tracing::warn!(value = raw, "unparsable upload date");
            None
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn humanize(delta: chrono::Duration) -> String {
    let secs = delta.num_seconds();
    if secs < 45 {
        return "just now".to_string();
    }
    let mins = ((secs as f64) / 60.0).round() as i64;
    let hours = ((mins as f64) / 60.0).round() as i64;
    let days = ((hours as f64) / 24.0).round() as i64;
    if secs < 90 {
        "a minute ago".to_string()
    } else if mins < 45 {
        format!("{} minutes ago", mins)
    } else if mins < 90 {
        "an hour ago".to_string()
    } else if hours < 22 {
        format!("{} hours ago", hours)
    } else if hours < 36 {
        "a day ago".to_string()
    } else if days < 26 {
        format!("{} days ago", days)
    } else if days < 46 {
        "a month ago".to_string()
    } else if days < 320 {
        format!("{} months ago", ((days as f64) / 30.0).round() as i64)
    } else if days < 548 {
        "a year ago".to_string()
    } else {
        format!("{} years ago", ((days as f64) / 365.0).round() as i64)
    }
}

/// One navigable segment of the current path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub label: String,
    pub target: String,
}

/// Split the current path into crumbs: a root `/` crumb, then one crumb per
/// non-empty segment targeting the normalized ancestor prefix.
pub fn breadcrumbs(path: &str) -> Vec<Crumb> {
    let mut crumbs = vec![Crumb {
        label: "/".to_string(),
        target: "/".to_string(),
    }];

    let mut prefix = String::from("/");
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        prefix.push_str(segment);
        prefix.push('/');
        crumbs.push(Crumb {
            label: format!("{}/", segment),
            target: prefix.clone(),
        });
    }

    crumbs
}

/// Normalize a folder path to a leading and trailing slash, dropping empty
/// and `.` segments.
pub fn normalize_folder(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    format!("/{}/", segments.join("/"))
}

pub fn parent_folder(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        None | Some(0) => "/".to_string(),
        Some(pos) => format!("{}/", &trimmed[..pos]),
    }
}
