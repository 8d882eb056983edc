use std::path::PathBuf;

pub const DAEMON_TCP_HOST: &str = "127.0.0.1";
pub const DAEMON_TCP_PORT: u16 = 9877;

pub fn data_dir() -> PathBuf {
    // ~/.local/share/meowtalk/ on every unix, macOS included
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join("meowtalk")
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("meowtalk")
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("meowtalk")
    }
    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("meowtalk")
    }
}

#[cfg(unix)]
fn notify_send_names() -> &'static [&'static str] {
    &["notify-send"]
}

#[cfg(windows)]
fn notify_send_names() -> &'static [&'static str] {
    &["notify-send.exe", "notify-send"]
}

#[cfg(target_os = "macos")]
fn opener_names() -> &'static [&'static str] {
    &["open"]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn opener_names() -> &'static [&'static str] {
    &["xdg-open"]
}

#[cfg(windows)]
fn opener_names() -> &'static [&'static str] {
    &["explorer.exe"]
}

fn find_beside_exe(names: &[&str]) -> Option<PathBuf> {
    let current_exe = std::env::current_exe().ok()?;
    let dir = current_exe.parent()?;
    for name in names {
        let p = dir.join(name);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        for name in names {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }
    None
}

/// Desktop notifier.  `NOTIFY_SEND_PATH` overrides, then beside the exe,
/// then PATH.
pub fn find_notify_send_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("NOTIFY_SEND_PATH") {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
    }
    find_beside_exe(notify_send_names()).or_else(|| find_on_path(notify_send_names()))
}

/// `systemd-run`, used for native scheduled triggers.  Only on PATH.
pub fn find_systemd_run_binary() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        find_on_path(&["systemd-run"])
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// URL/page opener for notification clicks.
pub fn find_opener_binary() -> Option<PathBuf> {
    find_on_path(opener_names())
}
