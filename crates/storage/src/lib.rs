pub mod content;
pub mod repository;
pub mod sqlite;
