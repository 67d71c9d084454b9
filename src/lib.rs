pub mod calendar;
pub mod clock;
pub mod compactor;
pub mod config;
pub mod engine;
pub mod grid;
pub mod grouped;
pub mod ids;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod repository;
pub mod segment;
pub mod service;
pub mod wal;
