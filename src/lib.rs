//! wordiary: a personal daily journal of short text entries and one photo per day.

pub mod config;
pub mod db;
pub mod imaging;
pub mod journal;
pub mod logging;
pub mod photos;
pub mod tasks;
