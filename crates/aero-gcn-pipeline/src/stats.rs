/// Snapshot of pipeline cache counters, suitable for profiling/telemetry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineCacheStats {
    /// Program lookups satisfied by an existing permutation.
    pub shader_module_hits: u64,
    /// Program lookups that compiled a new permutation.
    pub shader_module_misses: u64,
    pub shader_modules: u64,
    /// Distinct shader content hashes seen.
    pub programs: u64,

    pub graphics_pipeline_hits: u64,
    pub graphics_pipeline_misses: u64,
    pub graphics_pipelines: u64,

    pub compute_pipeline_hits: u64,
    pub compute_pipeline_misses: u64,
    pub compute_pipelines: u64,

    /// Key refreshes that reported "do not draw".
    pub skipped_draws: u64,
    pub skipped_dispatches: u64,
}
