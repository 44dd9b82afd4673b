//! Disease Risk API Library
//!
//! Serves pretrained disease-risk classifiers (cardiovascular, diabetes,
//! COPD, depression, kidney) over HTTP: loosely-typed client records are
//! coerced into fixed-order feature vectors, scored by a boosted-tree
//! ensemble, and answered with a binary prediction plus advice.
//!
//! # Modules
//!
//! - `advice`: Static advisory table.
//! - `app`: Router and middleware assembly.
//! - `booster`: XGBoost JSON/UBJSON model loading and tree-ensemble inference.
//! - `config`: Configuration management.
//! - `disease`: Disease and outcome types.
//! - `errors`: Error handling types.
//! - `features`: Per-disease feature assembly.
//! - `handlers`: HTTP request handlers.
//! - `input`: Loosely-typed records and coercion.
//! - `models`: Request/response bodies.
//! - `registry`: Model registry loaded at startup.
//! - `services`: Per-request risk evaluation.
//! - `ubjson`: Binary JSON decoding for UBJSON model files.

pub mod advice;
pub mod app;
pub mod booster;
pub mod config;
pub mod disease;
pub mod errors;
pub mod features;
pub mod handlers;
pub mod input;
pub mod models;
pub mod registry;
pub mod services;
pub mod ubjson;
