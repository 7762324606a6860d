pub mod cli;
pub mod commands;
pub mod config;
pub mod excel;
pub mod report;
pub mod sharepoint;
