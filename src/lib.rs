mod database {
    pub mod actions;
    pub mod colors;
    pub mod error;
    pub mod filter;
    pub mod form;
    pub mod pagination;
    pub mod pool;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;

pub mod api;
pub mod config;
pub mod media;
pub mod shopping;

pub use authentication::*;
pub use constants::*;
pub use database::*;
