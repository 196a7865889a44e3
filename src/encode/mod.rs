pub mod ffmpeg;
pub mod snapshot;
