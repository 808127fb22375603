//! Utilities for structured reporting of experimental results.
//!
//! Key/value pairs reported through the `report!` macro are collected into a
//! JSON object per thread and dumped to stdout when the `ReportingGuard`
//! created by `enable_reporting` is dropped. Reporting is a no-op unless a
//! guard is active, so library code can report unconditionally.

use serde_json::{Map, Value};
use std::cell::RefCell;

pub use serde_json::json;

pub mod benchmark;

thread_local! {
    static REPORTER: RefCell<Option<Map<String, Value>>> = const { RefCell::new(None) };
}

pub fn report(key: String, val: Value) {
    eprintln!("{}: {}", key, val);
    report_silent(key, val);
}

pub fn report_silent(key: String, val: Value) {
    REPORTER.with(|reporter| {
        if let Some(object) = reporter.borrow_mut().as_mut() {
            object.insert(key, val);
        }
    });
}

#[macro_export]
macro_rules! report {
    ($k:expr, $($json:tt)+) => { $crate::report::report($k.to_string(), $crate::report::json!($($json)+)) };
}

#[macro_export]
macro_rules! report_silent {
    ($k:expr, $($json:tt)+) => { $crate::report::report_silent($k.to_string(), $crate::report::json!($($json)+)) };
}

/// Activate reporting and return the guard which will dump the collected
/// values when dropped.
pub fn enable_reporting(program: &str) -> ReportingGuard {
    REPORTER.with(|reporter| reporter.replace(Some(Map::new())));
    report!("program", program);
    ReportingGuard {}
}

#[derive(Debug)]
pub struct ReportingGuard {}

impl Drop for ReportingGuard {
    fn drop(&mut self) {
        REPORTER.with(|reporter| {
            if let Some(object) = reporter.borrow_mut().take() {
                println!("{}", Value::Object(object));
            }
        });
    }
}
