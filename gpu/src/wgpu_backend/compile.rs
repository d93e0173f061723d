//! WGSL shader compilation — WGSL source → module → entry point → pipeline

use std::sync::Arc;

use super::device_init::WgpuDevice;

/// A validated shader module plus its naga IR, used for entry point lookup.
pub struct WgpuLibrary {
    pub module: Arc<wgpu::ShaderModule>,
    pub ir: naga::Module,
}

/// A compute entry point inside a [`WgpuLibrary`].
pub struct WgpuFunction {
    pub module: Arc<wgpu::ShaderModule>,
    pub entry_point: String,
    /// `@workgroup_size` declared by the entry point.
    pub workgroup_size: [u32; 3],
}

/// A compiled wgpu compute kernel ready for dispatch.
pub struct WgpuPipelineState {
    pub pipeline: wgpu::ComputePipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub max_workgroups_per_dimension: u32,
    pub workgroup_size: [u32; 3],
}

pub type WgpuPipeline = Arc<WgpuPipelineState>;

/// Parse and validate WGSL with naga, then build the wgpu shader module.
pub fn compile_library(ctx: &WgpuDevice, source: &str) -> Result<WgpuLibrary, String> {
    let ir = naga::front::wgsl::parse_str(source)
        .map_err(|e| format!("WGSL compilation failed: {}", e.emit_to_string(source)))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&ir)
    .map_err(|e| format!("WGSL validation failed: {}", e))?;

    let module = ctx
        .validation_scope(|| {
            ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("gpu_invoke_shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        })
        .map_err(|e| format!("WGSL compilation failed: {}", e))?;

    Ok(WgpuLibrary {
        module: Arc::new(module),
        ir,
    })
}

/// Resolve `name` as a compute-stage entry point of the library.
pub fn find_function(library: &WgpuLibrary, name: &str) -> Result<WgpuFunction, String> {
    let entry = compute_entry(&library.ir, name).ok_or_else(|| {
        format!(
            "compute entry point '{}' not found in shader module",
            name
        )
    })?;
    Ok(WgpuFunction {
        module: Arc::clone(&library.module),
        entry_point: entry.name.clone(),
        workgroup_size: entry.workgroup_size,
    })
}

fn compute_entry<'m>(module: &'m naga::Module, name: &str) -> Option<&'m naga::EntryPoint> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.name == name && ep.stage == naga::ShaderStage::Compute)
}

/// Create a compute pipeline with a layout derived from shader reflection.
pub fn create_pipeline(ctx: &WgpuDevice, function: &WgpuFunction) -> Result<WgpuPipeline, String> {
    let pipeline = ctx
        .validation_scope(|| {
            ctx.device
                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some("gpu_invoke_pipeline"),
                    layout: None,
                    module: &function.module,
                    entry_point: Some(function.entry_point.as_str()),
                    compilation_options: Default::default(),
                    cache: None,
                })
        })
        .map_err(|e| format!("pipeline creation failed: {}", e))?;

    let bind_group_layout = pipeline.get_bind_group_layout(0);

    Ok(Arc::new(WgpuPipelineState {
        pipeline,
        bind_group_layout,
        max_workgroups_per_dimension: ctx.device.limits().max_compute_workgroups_per_dimension,
        workgroup_size: function.workgroup_size,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
        @group(0) @binding(0) var<storage, read_write> a: array<f32>;

        /* @compute */ fn helper(x: f32) -> f32 { return x * 2.0; }

        @compute // tuned; keep in sync with the host {}
        @workgroup_size(64)
        fn double_all(@builtin(global_invocation_id) gid: vec3<u32>) {
            a[gid.x] = helper(a[gid.x]);
        }
    "#;

    #[test]
    fn test_entry_point_lookup_uses_parsed_module() {
        let module = naga::front::wgsl::parse_str(SOURCE).unwrap();

        let entry = compute_entry(&module, "double_all").unwrap();
        assert_eq!(entry.workgroup_size, [64, 1, 1]);
        assert!(compute_entry(&module, "helper").is_none());
        assert!(compute_entry(&module, "double").is_none());
        assert!(compute_entry(&module, "missing").is_none());
    }
}
