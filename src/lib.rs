pub mod config;
pub mod error;
pub mod extraction;
pub mod handlers;
pub mod routes;
pub mod session;
pub mod startup;
pub mod state;
pub mod translate;
