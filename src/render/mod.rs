pub mod backend;
pub mod compositor;
pub mod surface;
pub mod transform;
