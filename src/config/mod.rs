//! Configuration module for the links-tree request pipeline.
//!
//! Provides [`LinksOptions`] and its typestate builder [`LinksOptionsBuilder`],
//! validating and defaulting the options table in spec §6.

pub mod builder;
pub mod types;

pub use builder::{Complete, LinksOptionsBuilder, WithUrl};
pub use types::{
    CacheOptions, CleaningProcessor, ConcurrencyOptions, FetchMethod, FetchOptions,
    LinkExtractionOptions, LinksOptions, LinksOrder, MetricsOptions, RedirectPolicy,
};
