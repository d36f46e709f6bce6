use crate::app::{App, Message, Model, ToastLevel};
use crate::watcher::{RELOAD_DEBOUNCE, StepWatcher};

impl App {
    pub(super) fn make_step_watcher(&self) -> notify::Result<StepWatcher> {
        StepWatcher::new(&self.file_path, RELOAD_DEBOUNCE)
    }

    /// Effects that reach outside the model (disk, toasts about disk).
    /// `update` stays pure; the event loop runs this after it with the same
    /// message.
    pub(super) fn handle_message_side_effects(&self, model: &mut Model, msg: &Message) {
        match msg {
            Message::Save => match model.save_to_disk() {
                Ok(()) => {
                    model.show_toast(
                        ToastLevel::Info,
                        format!("Saved {}", model.file_path.display()),
                    );
                }
                Err(err) => {
                    model.show_toast(ToastLevel::Error, format!("Save failed: {err}"));
                    crate::perf::log_event(
                        "save.error",
                        format!("path={} err={err}", model.file_path.display()),
                    );
                }
            },
            Message::FileChanged => match model.reload_from_disk() {
                // A reload echoing our own save changes nothing; stay quiet
                Ok(true) => {
                    model.show_toast(ToastLevel::Info, "Step changed on disk, reloaded");
                }
                Ok(false) => {}
                Err(err) => {
                    model.show_toast(ToastLevel::Error, format!("Reload failed: {err}"));
                    crate::perf::log_event(
                        "reload.error",
                        format!("failed path={} err={err}", model.file_path.display()),
                    );
                }
            },
            _ => {}
        }
    }
}
