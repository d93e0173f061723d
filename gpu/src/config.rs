//! Dispatch options, optionally read from TOML.
//!
//! ```toml
//! [dispatch]
//! max-threads-per-group = 256
//! workgroup-size = 64
//! label = "saxpy"
//! ```

use serde::Deserialize;

use crate::error::KernelError;

/// Default `@workgroup_size` assumed for WGSL kernels.
pub const DEFAULT_WORKGROUP_SIZE: u32 = 256;

pub const DEFAULT_LABEL: &str = "gpu_invoke";

/// Tuning knobs for grid sizing and GPU object labels.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct DispatchOptions {
    /// Upper bound on Metal threadgroup width, applied on top of the
    /// pipeline's own `maxTotalThreadsPerThreadgroup`.
    pub max_threads_per_group: Option<usize>,
    /// Workgroup size the WGSL entry point declares. A kernel declaring a
    /// different `@workgroup_size` fails at grid sizing.
    pub workgroup_size: u32,
    /// Debug label for the per-dispatch encoding objects: the Metal compute
    /// encoder, the wgpu compute pass and bind group. Shader modules and
    /// pipelines are cached across dispatches and keep a fixed label.
    pub label: String,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        DispatchOptions {
            max_threads_per_group: None,
            workgroup_size: DEFAULT_WORKGROUP_SIZE,
            label: DEFAULT_LABEL.to_string(),
        }
    }
}

impl DispatchOptions {
    /// Parse options from TOML: either a `[dispatch]` section or bare keys.
    pub fn from_toml_str(content: &str) -> Result<Self, KernelError> {
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| KernelError::Config(e.to_string()))?;
        let options: DispatchOptions = match table.get("dispatch") {
            Some(section) => section.clone().try_into(),
            None => toml::Value::Table(table).try_into(),
        }
        .map_err(|e: toml::de::Error| KernelError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), KernelError> {
        if self.workgroup_size == 0 {
            return Err(KernelError::Config("workgroup-size must be non-zero".to_string()));
        }
        if self.max_threads_per_group == Some(0) {
            return Err(KernelError::Config(
                "max-threads-per-group must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Threadgroup width for a pipeline allowing at most `pipeline_max`
    /// threads, dispatching `count` threads in total.
    pub fn threads_per_group(&self, pipeline_max: usize, count: usize) -> usize {
        let cap = match self.max_threads_per_group {
            Some(limit) => pipeline_max.min(limit),
            None => pipeline_max,
        };
        cap.min(count).max(1)
    }
}
