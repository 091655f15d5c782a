use kanal::Sender;
use scrim_config::Config;
use scrim_types::AppEvent;

/// Shows the settings dialog. The dialog saves to the config store itself
/// and answers with `SettingsCommitted` or `SettingsCancelled` on `reply`.
pub trait SettingsDialog: Send + Sync {
    fn open(&mut self, current: &Config, reply: &Sender<AppEvent>);
}

/// Stand-in when no settings window exists: edits are made to the profile
/// file, and opening settings applies whatever is on disk right away.
#[derive(Debug, Default)]
pub struct HeadlessSettings;

impl SettingsDialog for HeadlessSettings {
    fn open(&mut self, _current: &Config, reply: &Sender<AppEvent>) {
        tracing::info!("no settings window, reloading the profile");
        match reply.try_send(AppEvent::SettingsCommitted) {
            Ok(true) => {}
            Ok(false) => tracing::warn!("event queue full, settings left open"),
            Err(e) => tracing::warn!("event queue closed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_dialog_commits_immediately() {
        let (tx, rx) = kanal::bounded(1);
        HeadlessSettings.open(&Config::default(), &tx);
        assert!(matches!(
            rx.try_recv(),
            Ok(Some(AppEvent::SettingsCommitted))
        ));
    }

    #[test]
    fn full_queue_does_not_block() {
        let (tx, rx) = kanal::bounded(1);
        tx.send(AppEvent::StopRequested).unwrap();
        HeadlessSettings.open(&Config::default(), &tx);
        assert_eq!(rx.len(), 1);
    }
}
