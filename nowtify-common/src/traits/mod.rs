// File: nowtify-common/src/traits/mod.rs
pub mod repository_traits;
pub mod sink_traits;
