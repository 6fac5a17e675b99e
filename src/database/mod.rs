pub mod postgres_repository;
pub mod profile;
pub mod proximity;
