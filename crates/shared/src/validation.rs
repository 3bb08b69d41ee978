use crate::constants::*;

pub fn validate_channel_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Channel name is required".into());
    }
    if trimmed.len() > MAX_CHANNEL_NAME_LENGTH {
        return Err(format!(
            "Channel name must be at most {} characters",
            MAX_CHANNEL_NAME_LENGTH
        ));
    }
    // Only allow lowercase alphanumeric, hyphens, underscores
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err("Channel name can only contain lowercase letters, numbers, hyphens, and underscores".into());
    }
    Ok(())
}

pub fn validate_channel_description(description: &str) -> Result<(), String> {
    if description.trim().len() > MAX_CHANNEL_DESCRIPTION_LENGTH {
        return Err(format!(
            "Channel description must be at most {} characters",
            MAX_CHANNEL_DESCRIPTION_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_message_content(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("Message content is required".into());
    }
    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.len() < MIN_USERNAME_LENGTH {
        return Err(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_LENGTH
        ));
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LENGTH
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(
            "Username can only contain letters, numbers, hyphens, and underscores".into(),
        );
    }
    Ok(())
}

pub fn validate_emoji(emoji: &str) -> Result<(), String> {
    let trimmed = emoji.trim();
    if trimmed.is_empty() {
        return Err("Emoji is required".into());
    }
    if trimmed.len() > MAX_EMOJI_LENGTH {
        return Err("Emoji is too long".into());
    }
    Ok(())
}

/// Accepts IANA-style names ("Europe/Rome", "UTC") without consulting a tz database.
pub fn validate_timezone(tz: &str) -> Result<(), String> {
    if tz.is_empty() || tz.len() > 64 {
        return Err("Invalid timezone".into());
    }
    if !tz
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '+'))
    {
        return Err("Invalid timezone".into());
    }
    Ok(())
}
