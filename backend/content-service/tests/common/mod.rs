#![allow(dead_code)]

pub mod memory_cache;
pub mod memory_repo;
