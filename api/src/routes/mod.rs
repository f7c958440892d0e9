pub mod advice;
pub mod chat;
pub mod crops;
pub mod diagnoses;
pub mod health;
pub mod sensors;
