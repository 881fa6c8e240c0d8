pub mod audio;
pub mod catalog;
pub mod config;
pub mod ui;

pub use audio::{PlaybackSession, PlayerEngine};
pub use catalog::Catalog;
pub use ui::PlayerUI;
