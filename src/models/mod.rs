pub mod message;
pub mod notification;
pub mod profile;
pub mod report;
