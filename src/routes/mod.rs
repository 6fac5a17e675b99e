pub mod account;
pub mod error;
pub mod health;
pub mod notification;
pub mod site;
