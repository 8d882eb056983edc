//! Desktop notifications through `notify-send`.
//!
//! The tag travels as the `x-canonical-private-synchronous` hint, so a second
//! notification with the same tag replaces the first instead of stacking.

use std::process::Stdio;

use tracing::{debug, info};

use crate::notification::{Dismissal, NotificationPayload};
use crate::platform;

const APP_NAME: &str = "MeowTalk";
/// Action key printed by `notify-send --wait` when the body is clicked.
const DEFAULT_ACTION: &str = "default";

pub fn notify_send_args(payload: &NotificationPayload, wait: bool) -> Vec<String> {
    let mut args = vec![
        format!("--app-name={}", APP_NAME),
        format!("--icon={}", payload.icon),
        format!("--hint=string:x-canonical-private-synchronous:{}", payload.tag),
    ];
    if wait {
        args.push("--wait".to_string());
        args.push(format!("--action={}=Open", DEFAULT_ACTION));
    }
    args.push(payload.title.clone());
    args.push(payload.body.clone());
    args
}

pub fn parse_dismissal(stdout: &str) -> Dismissal {
    if stdout.lines().any(|line| line.trim() == DEFAULT_ACTION) {
        Dismissal::Clicked
    } else {
        Dismissal::Closed
    }
}

fn notify_send_command(payload: &NotificationPayload, wait: bool) -> anyhow::Result<tokio::process::Command> {
    let binary = platform::find_notify_send_binary()
        .ok_or_else(|| anyhow::anyhow!("notify-send binary not found"))?;
    let mut cmd = tokio::process::Command::new(binary);
    cmd.args(notify_send_args(payload, wait))
        .stdin(Stdio::null())
        .stderr(Stdio::null());
    Ok(cmd)
}

/// Whether this host can show notifications at all.
pub fn is_supported() -> bool {
    platform::find_notify_send_binary().is_some()
}

/// Show and return straight away.
pub async fn show(payload: &NotificationPayload) -> anyhow::Result<()> {
    let status = notify_send_command(payload, false)?
        .stdout(Stdio::null())
        .status()
        .await?;
    if !status.success() {
        anyhow::bail!("notify-send exited with {}", status);
    }
    debug!("Notification shown: {:?}", payload.body);
    Ok(())
}

/// Show, then block until the user clicks or closes it.
pub async fn show_and_wait(payload: &NotificationPayload) -> anyhow::Result<Dismissal> {
    let output = notify_send_command(payload, true)?
        .stdout(Stdio::piped())
        .output()
        .await?;
    if !output.status.success() {
        anyhow::bail!("notify-send exited with {}", output.status);
    }
    let dismissal = parse_dismissal(&String::from_utf8_lossy(&output.stdout));
    info!("Notification {:?}: {:?}", dismissal, payload.body);
    Ok(dismissal)
}

/// Open (or focus) the site page.
pub async fn open_page(page: &str) -> anyhow::Result<()> {
    let opener = platform::find_opener_binary()
        .ok_or_else(|| anyhow::anyhow!("no page opener found"))?;
    tokio::process::Command::new(opener)
        .arg(page)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    info!("Opened {}", page);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::DEFAULT_ICON;

    #[test]
    fn test_args_carry_tag_hint() {
        let payload = NotificationPayload::phrase("nya nya", DEFAULT_ICON);
        let args = notify_send_args(&payload, false);
        assert_eq!(
            args,
            [
                "--app-name=MeowTalk",
                "--icon=sitelogo.png",
                "--hint=string:x-canonical-private-synchronous:hourly-phrase-notification",
                "A New MeowTalk Phrase Has Arrived!",
                "nya nya",
            ]
        );
    }

    #[test]
    fn test_wait_args_add_default_action() {
        let payload = NotificationPayload::phrase("nya", DEFAULT_ICON);
        let args = notify_send_args(&payload, true);
        assert!(args.contains(&"--wait".to_string()));
        assert!(args.contains(&"--action=default=Open".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("nya"));
    }

    #[test]
    fn test_parse_dismissal() {
        assert_eq!(parse_dismissal("default\n"), Dismissal::Clicked);
        assert_eq!(parse_dismissal(""), Dismissal::Closed);
        assert_eq!(parse_dismissal("other\n"), Dismissal::Closed);
    }
}
