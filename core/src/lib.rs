pub mod advice;
pub mod error;
pub mod knowledge;
pub mod sensors;
