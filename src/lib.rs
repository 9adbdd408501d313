#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod adapter;
pub mod clipboard;
pub mod config;
pub mod export;
pub mod history;
pub mod providers;
pub mod session;
pub mod store;
pub mod trace;
pub mod util;
