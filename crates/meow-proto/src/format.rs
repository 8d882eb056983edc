//! Display formatting for cards and stats.  All pure, no state.

use chrono::{DateTime, FixedOffset, Utc};

use crate::classify::CategoryTag;
use crate::feed::{parse_feed_date, ViewCount};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub const UNKNOWN_DATE: &str = "Unknown date";

/// `999` -> "999", `1500` -> "1.5K", `2_300_000` -> "2.3M".
pub fn format_count(n: u64) -> String {
    if n < 1000 {
        return group_digits(n);
    }

    // tenths of a thousand, rounded half up
    let tenths_k = (n + 50) / 100;
    if tenths_k < 10_000 {
        return format!("{}.{}K", tenths_k / 10, tenths_k % 10);
    }

    let tenths_m = (n + 50_000) / 100_000;
    format!("{}.{}M", group_digits(tenths_m / 10), tenths_m % 10)
}

pub fn format_view_count(views: ViewCount) -> String {
    match views {
        ViewCount::Count(n) => format_count(n),
        ViewCount::Unavailable => "N/A".to_string(),
    }
}

/// `1234567` -> "1,234,567".
pub fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Whole days between the two instants, rounded up.
pub fn days_between(published: DateTime<FixedOffset>, now: DateTime<Utc>) -> i64 {
    let diff_ms = (now.timestamp_millis() - published.timestamp_millis()).abs();
    (diff_ms + DAY_MS - 1) / DAY_MS
}

pub fn format_relative_date(published: DateTime<FixedOffset>, now: DateTime<Utc>) -> String {
    let days = days_between(published, now);
    match days {
        d if d <= 1 => "Today".to_string(),
        2 => "Yesterday".to_string(),
        d if d < 7 => format!("{} days ago", d),
        d if d < 30 => format!("{}w ago", d / 7),
        _ => published.format("%b %-d, %Y").to_string(),
    }
}

/// Home preview form: no weeks, no absolute dates.
pub fn format_days_ago(published: DateTime<FixedOffset>, now: DateTime<Utc>) -> String {
    match days_between(published, now) {
        d if d <= 1 => "Today".to_string(),
        2 => "Yesterday".to_string(),
        d => format!("{} days ago", d),
    }
}

/// Home preview view count: full digits.
pub fn format_full_view_count(views: ViewCount) -> String {
    match views {
        ViewCount::Count(n) => group_digits(n),
        ViewCount::Unavailable => "N/A".to_string(),
    }
}

/// Relative date for a raw feed timestamp.
pub fn format_published(raw: &str, now: DateTime<Utc>) -> String {
    match parse_feed_date(raw) {
        Some(date) => format_relative_date(date, now),
        None => UNKNOWN_DATE.to_string(),
    }
}

/// "January 5, 2024"
pub fn format_post_date(date: DateTime<FixedOffset>) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// "Jan 5"
pub fn format_short_date(date: DateTime<FixedOffset>) -> String {
    date.format("%b %-d").to_string()
}

pub fn format_category(tag: CategoryTag) -> &'static str {
    match tag {
        CategoryTag::Showcase => "Showcase",
        CategoryTag::Qna => "Q&A",
        CategoryTag::Animation => "Animation",
        CategoryTag::Collab => "Collab",
        CategoryTag::Bts => "Behind Scenes",
        CategoryTag::Other => "Other",
    }
}

/// Cut to `max_chars` characters and append "..." when the text is longer.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head.trim())
}

/// Text content of an HTML fragment.
pub fn strip_html(html: &str) -> String {
    let fragment = scraper::Html::parse_fragment(html);
    fragment.root_element().text().collect()
}
