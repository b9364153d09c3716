pub mod config;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod pairing;
pub mod pipeline;
pub mod stages;
pub mod tools;
pub mod validate;
pub mod workspace;
