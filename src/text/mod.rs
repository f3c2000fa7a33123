pub mod fonts;
pub mod layout;
pub mod paint;
