pub mod pane;
pub mod texture;
