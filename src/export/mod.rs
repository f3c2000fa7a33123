pub mod delivery;
pub mod snapshot;
pub mod still;
pub mod video;
