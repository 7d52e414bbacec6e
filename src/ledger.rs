pub mod controller;
pub mod memory;
pub mod model;
pub mod repository;
pub mod service;
