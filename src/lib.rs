pub mod config;
pub mod core;
pub mod models;

pub use crate::config::Config;
pub use crate::core::frames::decode_video_to_frames;
pub use crate::core::loader::load_video;
pub use crate::core::subtitle::SubtitleFetcher;

pub fn init_logging() {
    // env_logger on desktop; RUST_LOG overrides the default level
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .try_init();
}
