pub mod app;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod health;
pub mod middleware;

pub mod account {
    pub mod controller;
    pub mod error;
    pub mod repository;
    pub mod session;
    pub mod usecase;
}

pub mod event {
    pub mod arango;
    pub mod controller;
    pub mod error;
    pub mod memory;
    pub mod query;
    pub mod repository;
    pub mod store;
    pub mod usecase;
}

pub mod realtime {
    pub mod controller;
    pub mod feed;
    pub mod hub;
}




#[cfg(test)]
mod event_tests;

#[cfg(test)]
mod realtime_tests;
