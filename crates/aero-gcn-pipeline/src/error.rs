use thiserror::Error;

use crate::device::DeviceError;
use crate::regs::Stage;
use crate::translate::TranslateError;

/// Failures that make the current draw or dispatch impossible.
///
/// Unsupported register configurations and denylisted shaders are not errors; they surface as a
/// missing pipeline instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to translate {stage} shader {hash:#x}")]
    Translate {
        stage: Stage,
        hash: u64,
        #[source]
        source: TranslateError,
    },

    #[error("failed to create shader module for {stage} shader {hash:#x} (permutation {perm_idx})")]
    CreateShaderModule {
        stage: Stage,
        hash: u64,
        perm_idx: usize,
        #[source]
        source: DeviceError,
    },

    #[error("failed to create {kind} pipeline")]
    CreatePipeline {
        kind: &'static str,
        #[source]
        source: DeviceError,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
