//! `aero-gcn-pipeline` turns GCN command processor register state into pipeline keys and caches
//! the shader modules and pipeline objects built from them.
//!
//! This crate provides:
//! - A register snapshot model ([`regs::Regs`]) with the fields that affect pipeline identity.
//! - Canonical plain-old-data pipeline keys (see [`pipeline_key`]), including color target
//!   compaction.
//! - A two-level shader program cache that deduplicates permutations of the same bytecode
//!   (see [`program_cache::ShaderProgramCache`]).
//! - A pipeline object cache that creates exactly one object per distinct key
//!   (see [`PipelineCache`]).
//!
//! Shader recompilation and native object creation are delegated to implementations of
//! [`ShaderTranslator`] and [`Device`].

mod error;
mod key_builder;

pub mod config;
pub mod device;
pub mod dump;
pub mod format;
pub mod pipeline;
pub mod pipeline_cache;
pub mod pipeline_key;
pub mod program_cache;
pub mod regs;
pub mod runtime_info;
pub mod skip;
pub mod stats;
pub mod translate;

pub use config::PipelineCacheConfig;
pub use device::{Device, DeviceCapabilities, DeviceError};
pub use error::{PipelineError, Result};
pub use pipeline::{ComputePipeline, GraphicsPipeline};
pub use pipeline_cache::PipelineCache;
pub use pipeline_key::{ComputePipelineKey, GraphicsPipelineKey};
pub use program_cache::hash_combine;
pub use stats::PipelineCacheStats;
pub use translate::{BindingAllocator, Profile, ShaderInfo, ShaderTranslator, TranslateError};
