use chrono::{DateTime, Local, TimeZone};

pub fn format_timestamp(timestamp: i64) -> String {
    let datetime: DateTime<Local> = match Local.timestamp_millis_opt(timestamp).single() {
        Some(dt) => dt,
        None => return "-".to_string(),
    };

    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn preview_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut preview: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    preview.push_str("...");
    preview
}
