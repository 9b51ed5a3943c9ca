// src/cert/mod.rs
mod parser;

pub use parser::{days_remaining, parse_certificate, parse_certificate_at, CertificateExpiry};
