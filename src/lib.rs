pub mod app;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod enhance;
pub mod error;
pub mod gather;
pub mod geo;
pub mod language;
pub mod matcher;
pub mod models;
pub mod ranking;
pub mod streaming;
pub mod tmdb;
pub mod watchlist;
