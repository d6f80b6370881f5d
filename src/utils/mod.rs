pub mod components;
pub mod embed;

/// Discord message 2000-character limit.
pub fn truncate_for_discord(text: &str) -> String {
    if text.chars().count() <= 2000 {
        return text.to_string();
    }
    let truncated: String = text.chars().take(1997).collect();
    format!("{truncated}...")
}
