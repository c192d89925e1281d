pub mod compose;
pub mod simulate;
pub mod validate;
