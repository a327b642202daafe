mod playlist;
mod video;

pub use playlist::PlaylistIndex;
pub use video::{Timestamp, Video, Watermark};
