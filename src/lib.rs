pub mod agent;
pub mod config;
pub mod error;
pub mod launcher;
pub mod model;
pub mod ui;
pub mod web;
