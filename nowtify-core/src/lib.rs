// File: nowtify-core/src/lib.rs

pub mod db;
pub mod repositories;
pub mod platforms;
pub mod auth;
pub mod http;
pub mod tasks;
pub mod eventbus;
pub mod services;

pub use db::Database;
pub use nowtify_common::error::Error;
pub use http::{DefaultHttpClient, HttpClient, HttpResponse};
