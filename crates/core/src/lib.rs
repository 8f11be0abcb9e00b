#![forbid(unsafe_code)]

pub mod game;
pub mod model;
pub mod scheduler;
