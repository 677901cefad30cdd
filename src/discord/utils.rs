use std::time::Duration;

use serenity::all::Permissions;

use crate::store::StoreError;

pub(crate) const MAX_NAME_LEN: usize = 80;

// Leaves headroom under Discord's 4096 character embed description limit.
const MAX_LIST_LEN: usize = 3900;

/// Any one of these is enough to manage the character list.
pub fn has_admin_rights(permissions: Permissions) -> bool {
    permissions.intersects(Permissions::ADMINISTRATOR | Permissions::MANAGE_CHANNELS | Permissions::MANAGE_GUILD)
}

pub fn validate_character_name(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("❌ The character name cannot be empty".to_string());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("❌ The character name must be at most {MAX_NAME_LEN} characters long"));
    }
    Ok(name.to_string())
}

/// Removal skips the length cap so entries added outside the bot stay removable.
pub fn validate_removal_name(raw: &str) -> Result<String, String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err("❌ The character name cannot be empty".to_string());
    }
    Ok(name.to_string())
}

pub fn store_error_message(e: &StoreError) -> String {
    match e {
        StoreError::AlreadyExists(name) => format!("❌ Character **{name}** already exists"),
        StoreError::NotFound(name) => format!("❌ Character **{name}** was not found"),
        StoreError::LimitReached(max) => format!("❌ The character limit ({max}) has been reached"),
        StoreError::Unavailable(_) => "❌ The character list is unavailable right now, please try again later".to_string(),
    }
}

/// `1. Ryu` style lines, cut short with a remainder count when too long for one embed.
pub fn numbered_list(names: &[String]) -> String {
    let mut list = String::new();
    for (i, name) in names.iter().enumerate() {
        let line = format!("{}. {}\n", i + 1, name);
        if list.len() + line.len() > MAX_LIST_LEN {
            list.push_str(&format!("…and {} more", names.len() - i));
            return list;
        }
        list.push_str(&line);
    }
    list.trim_end().to_string()
}

pub fn format_uptime(uptime: Duration) -> String {
    let total_seconds = uptime.as_secs();
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let day_txt = if days == 1 { "day" } else { "days" };
    let hour_txt = if hours == 1 { "hour" } else { "hours" };
    let minute_txt = if minutes == 1 { "minute" } else { "minutes" };
    let second_txt = if seconds == 1 { "second" } else { "seconds" };

    //ex. 1 day, 2 hours, 3 minutes and 4 seconds
    if days > 0 {
        format!("{days} {day_txt}, {hours} {hour_txt}, {minutes} {minute_txt} and {seconds} {second_txt}")
    } else {
        format!("{hours} {hour_txt}, {minutes} {minute_txt} and {seconds} {second_txt}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_rights() {
        assert!(has_admin_rights(Permissions::ADMINISTRATOR));
        assert!(has_admin_rights(Permissions::MANAGE_CHANNELS));
        assert!(has_admin_rights(Permissions::MANAGE_GUILD | Permissions::SEND_MESSAGES));
        assert!(!has_admin_rights(Permissions::SEND_MESSAGES | Permissions::MANAGE_MESSAGES));
        assert!(!has_admin_rights(Permissions::empty()));
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        assert_eq!(validate_character_name("  Ryu ").unwrap(), "Ryu");
        assert!(validate_character_name("   ").is_err());
        assert_eq!(validate_character_name(&"春".repeat(80)).unwrap().chars().count(), 80);
        assert!(validate_character_name(&"春".repeat(81)).is_err());
    }

    #[test]
    fn long_names_can_still_be_removed() {
        let long = "x".repeat(120);
        assert!(validate_character_name(&long).is_err());
        assert_eq!(validate_removal_name(&format!(" {long} ")).unwrap(), long);
        assert!(validate_removal_name("  ").is_err());
    }

    #[test]
    fn store_errors_read_well() {
        assert_eq!(store_error_message(&StoreError::AlreadyExists("Ken".to_string())), "❌ Character **Ken** already exists");
        assert_eq!(store_error_message(&StoreError::LimitReached(25)), "❌ The character limit (25) has been reached");
        assert!(!store_error_message(&StoreError::Unavailable("connection refused".to_string())).contains("connection refused"));
    }

    #[test]
    fn numbered_list_lines() {
        let names = vec!["Ryu".to_string(), "Ken".to_string()];
        assert_eq!(numbered_list(&names), "1. Ryu\n2. Ken");
    }

    #[test]
    fn numbered_list_is_cut_short() {
        let names: Vec<String> = (0..200).map(|i| format!("{i:0>40}")).collect();
        let list = numbered_list(&names);
        assert!(list.len() < 4096);
        assert!(list.ends_with("more"));
    }

    #[test]
    fn uptime_pluralization() {
        assert_eq!(format_uptime(Duration::from_secs(3661)), "1 hour, 1 minute and 1 second");
        assert_eq!(format_uptime(Duration::from_secs(59)), "0 hours, 0 minutes and 59 seconds");
        assert_eq!(format_uptime(Duration::from_secs(2 * 86_400 + 7200)), "2 days, 2 hours, 0 minutes and 0 seconds");
    }
}
