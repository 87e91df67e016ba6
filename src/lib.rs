pub mod api;
pub mod bootstrap;
pub mod core;
pub mod db;
