pub mod emoji;
pub mod format;
pub mod time;
pub mod validation;
