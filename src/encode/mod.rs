pub mod container;
pub mod ffmpeg;
pub mod sink;
