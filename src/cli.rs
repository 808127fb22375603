//! Argument handling for the index, query and update programs.

use std::{error::Error, fmt};

/// Raised when a program is invoked with missing or malformed arguments;
/// carries the usage line of the offending binary.
#[derive(Debug)]
pub struct UsageErr(pub &'static str);

impl UsageErr {
    pub const INDEX: UsageErr = UsageErr("index <graph> <index_prefix>");
    pub const QUERY: UsageErr = UsageErr("query <index_prefix> <queries>");
    pub const UPDATE: UsageErr = UsageErr("update <graph> <index_prefix> <updates> d|i");
}

impl fmt::Display for UsageErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "usage: {}", self.0)
    }
}

impl Error for UsageErr {}
