pub mod address;
pub mod app;
pub mod catalog;
pub mod config;
pub mod context;
pub mod domain;
pub mod drawer;
pub mod error;
pub mod output;
pub mod probe;
pub mod projector;
pub mod query;
pub mod resolver;
pub mod selection;
