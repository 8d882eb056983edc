use serde::{Deserialize, Serialize};

pub const NOTIFICATION_TITLE: &str = "A New MeowTalk Phrase Has Arrived!";
/// Shared by the foreground and background paths so that two notifications
/// for the same hour collapse into one.
pub const NOTIFICATION_TAG: &str = "hourly-phrase-notification";
pub const DEFAULT_ICON: &str = "sitelogo.png";

/// Local notification permission.  Anything but `Granted` means "stay quiet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    Default,
    Granted,
    Denied,
}

impl Permission {
    pub fn is_granted(&self) -> bool {
        matches!(self, Permission::Granted)
    }

    /// Status line shown next to the enable button.
    pub fn status_message(&self) -> &'static str {
        match self {
            Permission::Granted => "Hourly notifications are enabled. ✅",
            Permission::Denied => {
                "Notifications are blocked. Run `meowtalk notifications enable` to allow them."
            }
            Permission::Default => {
                "Run `meowtalk notifications enable` to receive a notification when the phrase changes."
            }
        }
    }
}

pub const UNSUPPORTED_MESSAGE: &str = "This system does not support notifications.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub tag: String,
}

impl NotificationPayload {
    pub fn phrase(phrase: &str, icon: &str) -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            body: phrase.to_string(),
            icon: icon.to_string(),
            tag: NOTIFICATION_TAG.to_string(),
        }
    }
}

/// How a shown notification ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dismissal {
    Clicked,
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_uses_fixed_title_and_tag() {
        let payload = NotificationPayload::phrase("KYAAAAA~~", DEFAULT_ICON);
        assert_eq!(payload.title, "A New MeowTalk Phrase Has Arrived!");
        assert_eq!(payload.tag, "hourly-phrase-notification");
        assert_eq!(payload.body, "KYAAAAA~~");
        assert_eq!(payload.icon, "sitelogo.png");
    }

    #[test]
    fn test_permission_serde() {
        assert_eq!(serde_json::to_string(&Permission::Granted).unwrap(), "\"granted\"");
        let p: Permission = serde_json::from_str("\"denied\"").unwrap();
        assert_eq!(p, Permission::Denied);
        assert!(!Permission::default().is_granted());
    }
}
