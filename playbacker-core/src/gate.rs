pub const CHANGE_SETLIST_PROMPT: &str = "Change current setlist?";

/// Blocking user interaction provided by the presentation layer.
pub trait Dialog {
    /// Ask a yes/no question and wait for the answer.
    fn confirm(&self, message: &str) -> bool;

    /// Show a message and wait until it is acknowledged.
    fn alert(&self, message: &str);
}

/// Decide whether the active setlist may change from `prev` to `next`.
/// Leaving a setlist while it is playing needs the user's confirmation.
pub fn allow_setlist_change(
    playing: bool,
    prev: Option<&str>,
    next: Option<&str>,
    dialog: &dyn Dialog,
) -> bool {
    match prev {
        Some(prev) if playing && next != Some(prev) => dialog.confirm(CHANGE_SETLIST_PROMPT),
        _ => true,
    }
}
