//! Daemon library for the canary probe service

#![allow(unused_crate_dependencies)]

pub mod bootstrap;
pub mod http;
pub mod simple_error;

#[cfg(test)]
mod simple_error_tests;

pub use bootstrap::{
    bootstrap, bootstrap_with, bootstrap_with_grace, BootstrapHandle, Phase, GRACE_PERIOD,
};
pub use simple_error::{DaemonError, Result};
