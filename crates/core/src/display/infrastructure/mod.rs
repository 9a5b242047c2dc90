pub mod headless_display;
pub mod terminal_display;
