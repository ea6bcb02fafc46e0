// src/lib.rs

//! Website security scanner engine: DNS, TLS, HTTP header and content
//! analysis, safe vulnerability probes and a weighted score.

pub mod core;
pub mod logging;
