//! Crowdfund - a crowdfunding backend
//!
//! Users register and log in, create fundraising campaigns and attach
//! images to them. The HTTP layer is a thin axum adapter over the use cases
//! in [`services`].

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
