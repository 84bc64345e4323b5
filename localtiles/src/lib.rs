#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod http;
pub mod interceptor;
pub mod logging;
pub mod resolver;
pub mod router;
pub mod storage;

mod utils;
pub use utils::{LocalTilesError, LocalTilesResult};
