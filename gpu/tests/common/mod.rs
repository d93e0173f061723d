//! Recording mock backend shared by the integration tests.
//!
//! Every collaborator call is logged on the device it belongs to, any step
//! can be made to fail, and a handful of named kernels run on the CPU at
//! commit time so results and grid sizes can be checked without a GPU.

#![allow(dead_code)]

use std::sync::Arc;

use gpu_invoke::{Backend, DType, DispatchOptions, GpuBuffer};
use parking_lot::Mutex;

/// A CPU kernel body: one call per thread id over the bound buffers.
pub type KernelFn = fn(usize, &mut [Vec<f32>]) -> Result<(), String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CompileLibrary,
    Function(String),
    Pipeline,
    CommandQueue,
    CommandBuffer,
    Encoder,
    SetPipeline,
    SetBuffer { slot: usize, len: usize },
    Dispatch { count: usize, threads_per_group: usize },
    EndEncoding,
    Commit,
    Wait,
}

impl Event {
    pub fn is_compile(&self) -> bool {
        matches!(
            self,
            Event::CompileLibrary | Event::Function(_) | Event::Pipeline | Event::CommandQueue
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Library,
    Function,
    Pipeline,
    CommandQueue,
    CommandBuffer,
    Encoder,
    SetPipeline,
    SetBuffer(usize),
    Dispatch,
    EndEncoding,
    Commit,
    Wait,
}

pub struct DeviceState {
    pub id: usize,
    pub max_threads_per_group: usize,
    events: Mutex<Vec<Event>>,
    fail: Mutex<Option<FailAt>>,
}

pub type MockDevice = Arc<DeviceState>;

impl DeviceState {
    pub fn new(id: usize) -> MockDevice {
        Arc::new(DeviceState {
            id,
            max_threads_per_group: 1024,
            events: Mutex::new(Vec::new()),
            fail: Mutex::new(None),
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn compile_events(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| **e == Event::CompileLibrary)
            .count()
    }

    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    pub fn fail_at(&self, point: FailAt) {
        *self.fail.lock() = Some(point);
    }

    pub fn heal(&self) {
        *self.fail.lock() = None;
    }

    fn step(&self, point: FailAt, event: Event) -> Result<(), String> {
        if *self.fail.lock() == Some(point) {
            return Err(format!("injected failure at {:?}", point));
        }
        self.events.lock().push(event);
        Ok(())
    }
}

pub type MockStorage = Arc<Mutex<Vec<f32>>>;

pub struct MockLibrary {
    device: MockDevice,
    source: String,
}

pub struct MockFunction {
    device: MockDevice,
    kernel: KernelFn,
}

pub struct MockPipeline {
    device: MockDevice,
    kernel: KernelFn,
}

struct Recorded {
    kernel: KernelFn,
    bindings: Vec<(usize, MockStorage)>,
    grid: usize,
}

pub struct MockCommandBuffer {
    device: MockDevice,
    recorded: Option<Recorded>,
    fault: Option<String>,
}

pub struct MockEncoder {
    device: MockDevice,
    kernel: Option<KernelFn>,
    bindings: Vec<(usize, MockStorage)>,
    grid: Option<usize>,
}

fn scaleaccum_kernel(id: usize, bufs: &mut [Vec<f32>]) -> Result<(), String> {
    let scale = *bufs[2].first().ok_or("scale buffer is empty")?;
    let b = *bufs[1].get(id).ok_or("b index out of bounds")?;
    let a = bufs[0].get_mut(id).ok_or("a index out of bounds")?;
    *a += b * scale;
    Ok(())
}

fn fill_index_kernel(id: usize, bufs: &mut [Vec<f32>]) -> Result<(), String> {
    let slot = bufs[0].get_mut(id).ok_or("index out of bounds")?;
    *slot = id as f32;
    Ok(())
}

/// Counts launched threads into the first element of the last buffer.
fn count_threads_kernel(_id: usize, bufs: &mut [Vec<f32>]) -> Result<(), String> {
    let counter = bufs
        .last_mut()
        .and_then(|b| b.first_mut())
        .ok_or("no counter buffer")?;
    *counter += 1.0;
    Ok(())
}

/// Kernels the mock compiler knows how to run.
fn builtin_kernel(name: &str) -> Option<KernelFn> {
    match name {
        "scaleaccum" => Some(scaleaccum_kernel as KernelFn),
        "fill_index" => Some(fill_index_kernel as KernelFn),
        "count_threads" => Some(count_threads_kernel as KernelFn),
        _ => None,
    }
}

/// Marker type selecting the mock backend.
pub struct Mock;

impl Backend for Mock {
    type Device = MockDevice;
    type Storage = MockStorage;
    type Library = MockLibrary;
    type Function = MockFunction;
    type Pipeline = MockPipeline;
    type Queue = MockDevice;
    type CommandBuffer = MockCommandBuffer;
    type Encoder = MockEncoder;

    const NAME: &'static str = "mock";

    fn same_device(a: &MockDevice, b: &MockDevice) -> bool {
        Arc::ptr_eq(a, b)
    }

    fn describe_device(device: &MockDevice) -> String {
        format!("mock-{}", device.id)
    }

    fn compile_library(device: &MockDevice, source: &str) -> Result<MockLibrary, String> {
        device.step(FailAt::Library, Event::CompileLibrary)?;
        if source.contains("#error") {
            return Err("source contains #error".to_string());
        }
        Ok(MockLibrary {
            device: Arc::clone(device),
            source: source.to_string(),
        })
    }

    fn function(library: &MockLibrary, name: &str) -> Result<MockFunction, String> {
        library
            .device
            .step(FailAt::Function, Event::Function(name.to_string()))?;
        let declared = library.source.contains(&format!("kernel void {}(", name));
        match builtin_kernel(name) {
            Some(kernel) if declared => Ok(MockFunction {
                device: Arc::clone(&library.device),
                kernel,
            }),
            _ => Err(format!("function '{}' not found", name)),
        }
    }

    fn pipeline(device: &MockDevice, function: &MockFunction) -> Result<MockPipeline, String> {
        device.step(FailAt::Pipeline, Event::Pipeline)?;
        Ok(MockPipeline {
            device: Arc::clone(&function.device),
            kernel: function.kernel,
        })
    }

    fn command_queue(device: &MockDevice) -> Result<MockDevice, String> {
        device.step(FailAt::CommandQueue, Event::CommandQueue)?;
        Ok(Arc::clone(device))
    }

    fn command_buffer(queue: &MockDevice) -> Result<MockCommandBuffer, String> {
        queue.step(FailAt::CommandBuffer, Event::CommandBuffer)?;
        Ok(MockCommandBuffer {
            device: Arc::clone(queue),
            recorded: None,
            fault: None,
        })
    }

    fn compute_encoder(command_buffer: &mut MockCommandBuffer) -> Result<MockEncoder, String> {
        command_buffer.device.step(FailAt::Encoder, Event::Encoder)?;
        Ok(MockEncoder {
            device: Arc::clone(&command_buffer.device),
            kernel: None,
            bindings: Vec::new(),
            grid: None,
        })
    }

    fn set_pipeline(encoder: &mut MockEncoder, pipeline: &MockPipeline) -> Result<(), String> {
        encoder.device.step(FailAt::SetPipeline, Event::SetPipeline)?;
        encoder.kernel = Some(pipeline.kernel);
        Ok(())
    }

    fn set_buffer(encoder: &mut MockEncoder, storage: &MockStorage, slot: usize) -> Result<(), String> {
        let len = storage.lock().len();
        encoder
            .device
            .step(FailAt::SetBuffer(slot), Event::SetBuffer { slot, len })?;
        encoder.bindings.push((slot, Arc::clone(storage)));
        Ok(())
    }

    fn dispatch_threads(
        encoder: &mut MockEncoder,
        pipeline: &MockPipeline,
        count: usize,
        options: &DispatchOptions,
    ) -> Result<(), String> {
        let threads_per_group =
            options.threads_per_group(pipeline.device.max_threads_per_group, count);
        encoder.device.step(
            FailAt::Dispatch,
            Event::Dispatch {
                count,
                threads_per_group,
            },
        )?;
        encoder.grid = Some(count);
        Ok(())
    }

    fn end_encoding(command_buffer: &mut MockCommandBuffer, encoder: MockEncoder) -> Result<(), String> {
        encoder.device.step(FailAt::EndEncoding, Event::EndEncoding)?;
        let kernel = encoder.kernel.ok_or("no pipeline bound")?;
        let grid = encoder.grid.ok_or("grid never sized")?;
        command_buffer.recorded = Some(Recorded {
            kernel,
            bindings: encoder.bindings,
            grid,
        });
        Ok(())
    }

    fn commit(command_buffer: &mut MockCommandBuffer) -> Result<(), String> {
        command_buffer.device.step(FailAt::Commit, Event::Commit)?;
        let recorded = command_buffer.recorded.take().ok_or("nothing encoded")?;
        command_buffer.fault = run_kernel(recorded).err();
        Ok(())
    }

    fn wait_until_completed(command_buffer: MockCommandBuffer) -> Result<(), String> {
        command_buffer.device.step(FailAt::Wait, Event::Wait)?;
        match command_buffer.fault {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }
}

/// Run a recorded dispatch on the CPU, writing results back to storage.
fn run_kernel(recorded: Recorded) -> Result<(), String> {
    let mut bindings = recorded.bindings;
    bindings.sort_by_key(|(slot, _)| *slot);
    let mut data: Vec<Vec<f32>> = bindings.iter().map(|(_, s)| s.lock().clone()).collect();

    let mut result = Ok(());
    for id in 0..recorded.grid {
        if let Err(e) = (recorded.kernel)(id, &mut data) {
            result = Err(format!("thread {}: {}", id, e));
            break;
        }
    }

    for ((_, storage), values) in bindings.iter().zip(data) {
        *storage.lock() = values;
    }
    result
}

/// Source text the mock compiler accepts for `name`.
pub fn mock_source(name: &str) -> String {
    format!("kernel void {}(device float* a [[buffer(0)]]) {{ }}", name)
}

pub fn buffer(device: &MockDevice, shape: Vec<usize>, data: Vec<f32>) -> GpuBuffer<Mock> {
    GpuBuffer::new(
        Arc::clone(device),
        shape,
        DType::F32,
        Arc::new(Mutex::new(data)),
    )
}

pub fn zeros(device: &MockDevice, shape: Vec<usize>) -> GpuBuffer<Mock> {
    let n = shape.iter().product();
    buffer(device, shape, vec![0.0; n])
}

pub fn contents(buffer: &GpuBuffer<Mock>) -> Vec<f32> {
    buffer.storage().lock().clone()
}
