//! Metal shader compilation — MSL source → library → function → pipeline

use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2_foundation::NSString;
use objc2_metal::{
    MTLCommandQueue, MTLComputePipelineState, MTLDevice, MTLFunction, MTLLibrary,
};

use super::device_init::MetalDevice;

pub type MetalLibrary = Retained<ProtocolObject<dyn MTLLibrary>>;
pub type MetalFunction = Retained<ProtocolObject<dyn MTLFunction>>;
pub type MetalPipeline = Retained<ProtocolObject<dyn MTLComputePipelineState>>;
pub type MetalQueue = Retained<ProtocolObject<dyn MTLCommandQueue>>;

/// Compile MSL source into a library.
pub fn compile_library(device: &MetalDevice, source: &str) -> Result<MetalLibrary, String> {
    let source_ns = NSString::from_str(source);
    device
        .newLibraryWithSource_options_error(&source_ns, None)
        .map_err(|e| format!("MSL compilation failed: {}", e.localizedDescription()))
}

/// Look up a kernel function by name.
pub fn find_function(library: &MetalLibrary, fn_name: &str) -> Result<MetalFunction, String> {
    let fn_name_ns = NSString::from_str(fn_name);
    library.newFunctionWithName(&fn_name_ns).ok_or_else(|| {
        format!(
            "kernel function '{}' not found in compiled library",
            fn_name
        )
    })
}

pub fn create_pipeline(
    device: &MetalDevice,
    function: &MetalFunction,
) -> Result<MetalPipeline, String> {
    device
        .newComputePipelineStateWithFunction_error(function)
        .map_err(|e| format!("pipeline creation failed: {}", e.localizedDescription()))
}

pub fn create_queue(device: &MetalDevice) -> Result<MetalQueue, String> {
    device
        .newCommandQueue()
        .ok_or_else(|| "device returned no command queue".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metal::device_init;

    const SCALE_SOURCE: &str = r#"
        #include <metal_stdlib>
        using namespace metal;

        kernel void scale_in_place(
            device float* a       [[buffer(0)]],
            device const float* s [[buffer(1)]],
            uint id [[thread_position_in_grid]]
        ) {
            a[id] = a[id] * s[0];
        }
    "#;

    #[test]
    fn test_compile_simple_kernel() {
        let Some(device) = device_init::system_default_device() else {
            println!("Metal not available, skipping");
            return;
        };

        let library = compile_library(&device, SCALE_SOURCE).unwrap();
        let function = find_function(&library, "scale_in_place").unwrap();
        let pipeline = create_pipeline(&device, &function).unwrap();
        assert!(pipeline.maxTotalThreadsPerThreadgroup() > 0);
        println!(
            "max_threads_per_group: {}",
            pipeline.maxTotalThreadsPerThreadgroup()
        );
    }

    #[test]
    fn test_missing_function_and_bad_source() {
        let Some(device) = device_init::system_default_device() else {
            println!("Metal not available, skipping");
            return;
        };

        let library = compile_library(&device, SCALE_SOURCE).unwrap();
        let err = find_function(&library, "no_such_kernel").unwrap_err();
        assert!(err.contains("no_such_kernel"));

        let err = compile_library(&device, "kernel void broken( {").unwrap_err();
        assert!(err.starts_with("MSL compilation failed"));
    }
}
