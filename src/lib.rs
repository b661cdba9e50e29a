//! Hardsub - Batch Subtitle Burn-in
//!
//! Finds video/subtitle pairs in a directory tree, burns each subtitle into
//! its video with ffmpeg (NVENC first, x264 as fallback) and replaces the
//! originals with the merged result.

pub mod cli;
pub mod config;
pub mod workflow;
pub mod pairing;
pub mod runner;
pub mod media;
pub mod job;
pub mod error;
pub mod logging;
