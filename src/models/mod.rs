pub mod caption;

pub use caption::{CaptionEvent, CaptionTrack, PlayerResponse};
