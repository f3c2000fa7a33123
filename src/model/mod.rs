pub mod adjustments;
pub mod annotation;
pub mod media;
