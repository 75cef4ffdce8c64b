// src/lib.rs

//! CTI link queue: collects threat-intel article links, scores them, merges
//! batches by canonical URL, flags quality and selects winners per category.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
