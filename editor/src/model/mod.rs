mod config;

pub use config::ViewerConfig;
