// src/processing/mod.rs
//! Firmware filter chain construction and software stage models

pub mod chain;
pub mod stages;

pub use chain::{ChainSpec, ChainStage, FilterChain, FilterChainBuilder, CHAIN_LENGTH};
pub use stages::{Delta, MovingAverage, Processor, ProcessorChain, Rss};
