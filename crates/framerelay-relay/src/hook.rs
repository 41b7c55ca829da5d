use framerelay_wire::SettingsMessage;
use tracing::info;

/// Receives settings messages pushed by the core.
///
/// Called on the responder thread; the core gets no reply, so a hook has no
/// way to report failure back over the wire.
pub trait SettingsHook {
    fn on_settings(&mut self, message: SettingsMessage);
}

impl<F> SettingsHook for F
where
    F: FnMut(SettingsMessage),
{
    fn on_settings(&mut self, message: SettingsMessage) {
        self(message)
    }
}

/// Logs every settings message and otherwise ignores it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSettingsHook;

impl SettingsHook for LogSettingsHook {
    fn on_settings(&mut self, message: SettingsMessage) {
        info!(
            key = %message.key_lossy(),
            value = %message.value_lossy(),
            value_type = message.value_type,
            "received settings"
        );
    }
}
