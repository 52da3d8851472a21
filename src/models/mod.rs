pub mod config;
pub mod game;
pub mod grid;
pub mod roi;
pub mod ticket;
