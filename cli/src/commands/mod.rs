pub mod advise;
pub mod chat;
pub mod crops;
pub mod diagnose;
pub mod health;
pub mod sensors;
