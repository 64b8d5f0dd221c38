//! Terminal weather client: type a city, get a seven-day forecast table,
//! store it remotely or download the sky image.

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod forecast;
pub mod render;
