pub mod banner;
pub mod progress;
pub mod render;
pub mod tui;

/// Prints the welcome banner and applies the theme for all subsequent inquire prompts.
/// Call once at startup, after tracing init.
pub fn init_ui(user_id: &str) {
    banner::print_welcome(user_id);
    tui::apply_theme();
}
