pub mod bot;
pub mod config;
pub mod data;
pub mod db;
pub mod form;
pub mod nav;
pub mod service;
pub mod view;
