use anyhow::Result;

/// Delivers the end-of-session signal to the desktop.
pub trait Notifier: Send {
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self {
            app_name: "focus".to_string(),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .appname(&self.app_name)
            .show()?;
        Ok(())
    }
}
