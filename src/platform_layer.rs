pub mod message_box;

pub use message_box::{ERROR_DIALOG_TITLE, show_error_dialog};
