//! Smokefree - cessation metrics and progress tracking for people quitting smoking.
//!
//! # Overview
//!
//! Members answer a survey (smoking history plus the six-item Fagerström
//! Test for Nicotine Dependence). The answers are scored once into a
//! metrics snapshot: pack-years, FTND score and addiction level, a
//! quit-success estimate and projected savings. The snapshot is stored and
//! shown verbatim to the member and their coach. A daily progress log drives
//! streaks, money saved, an achievement score and the health timeline.
//!
//! # Modules
//!
//! - [`calculator`]: Pure scoring functions
//! - [`tables`]: Scoring tables the calculator is driven by
//! - [`progress`]: Progress summaries derived from the daily log
//! - [`model`]: Data types and wire schema
//! - [`mapping`]: Conversion of legacy survey records
//! - [`storage`]: SQLite storage layer
//! - [`api`]: HTTP API handlers
//! - [`config`]: Environment configuration
//! - [`error`]: HTTP error type

pub mod api;
pub mod calculator;
pub mod config;
pub mod error;
pub mod mapping;
pub mod model;
pub mod progress;
pub mod storage;
pub mod tables;
