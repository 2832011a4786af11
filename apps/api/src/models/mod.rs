pub mod candidate;
pub mod document;
pub mod notification;
pub mod performance;
pub mod training;
pub mod user;
