//! bmi-server: a TCP body-mass-index service.
//!
//! A client sends one JSON object with sex, age, height and mass; the server
//! validates it, computes and classifies the BMI, and answers with one JSON
//! object before closing the connection.
//!
//! - `bmi`: BMI formula and category bands
//! - `protocol`: JSON wire records and codec
//! - `processor`: coercion, validation and evaluation of requests
//! - `server`: listener, accept loop and per-connection handler
//! - `client`: one-shot client used by the `bmi-client` binary
//! - `config`: server configuration via CLI arguments or TOML file

pub mod bmi;
pub mod client;
pub mod config;
pub mod processor;
pub mod protocol;
pub mod server;
