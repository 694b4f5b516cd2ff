extern crate serde;
extern crate toml;

pub mod configs;
pub mod electronics;
pub mod errors;
pub mod linefit;
pub mod logbook;
pub mod planner;
pub mod replay;
pub mod scanner;
pub mod search;
pub mod segment;
pub mod session;
pub mod sim;
pub mod temperature;
pub mod util;
