pub mod picker;
pub mod terminal;
pub mod theme;

pub use picker::PatchPicker;
pub use terminal::PlayerUI;
pub use theme::{Theme, ThemePicker};
