/// Messages from background actions back to the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    ActionFailed { action: &'static str, message: String },
    Notice(String),
    DirectorySelected(String),
}
