// src/messages.rs

/// Render a user mention
pub fn mention(user_id: &str) -> String {
    format!("<@{}>", user_id)
}

/// Neutralise Discord markdown and mention syntax in user-supplied text.
///
/// Player names come from the game engine or from `/link` input, so they must
/// render literally: `@everyone`, `<@123>` or `**bold**` stay plain text.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '*' | '_' | '~' | '`' | '|' | '>' | '<' | '#' | '[' | ']' | '(' | ')' => {
                escaped.push('\\');
                escaped.push(c);
            }
            // Zero-width space after '@' breaks mention parsing
            '@' => {
                escaped.push('@');
                escaped.push('\u{200B}');
            }
            c if c.is_control() => {}
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn match_started_message(player_one: &str, player_two: &str, started_at: &str) -> String {
    format!(
        "🎮 New game started! {} vs {}\n🕒 {}",
        player_one,
        player_two,
        escape_markdown(started_at)
    )
}

pub fn match_thread_title(player_one: &str, player_two: &str) -> String {
    // Discord caps thread names at 100 characters
    format!("{} vs {}", player_one, player_two)
        .chars()
        .filter(|c| !c.is_control())
        .take(96)
        .collect()
}

pub fn link_success_message(normalized_name: &str, user_id: &str) -> String {
    format!(
        "✅ Linked **{}** to {}\n\nYou'll be pinged when a match with this player name starts.",
        escape_markdown(normalized_name),
        mention(user_id)
    )
}

pub fn link_usage_message() -> String {
    "Usage: `/link playername:<your in-game name>`".to_string()
}

pub fn link_invalid_name_message(max_len: usize) -> String {
    format!(
        "❌ **Invalid player name**\n\nPlayer names must be between 1 and {} characters.\n\n{}",
        max_len,
        link_usage_message()
    )
}

pub fn unsupported_command_message(name: &str) -> String {
    format!("❌ Unsupported command `/{}`", escape_markdown(name))
}

pub fn unsupported_interaction_message() -> String {
    "❌ Unsupported".to_string()
}
