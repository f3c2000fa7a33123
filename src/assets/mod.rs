pub mod color;
pub mod decode;
pub mod media;
pub mod pending;
pub mod source;
pub mod svg_raster;
pub mod template;
