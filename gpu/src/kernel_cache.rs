//! Kernel cache — avoids recompiling the kernel on every invocation.
//!
//! Holds a single entry: the most recently compiled kernel, keyed by
//! (device identity, function name, source text). A request with a different
//! key replaces the entry as a whole. The cache is owned by the caller (via
//! the [`Dispatcher`](crate::Dispatcher)), so its lifetime and sharing are the
//! caller's decision.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use log::{debug, warn};

use crate::backend::Backend;
use crate::error::{CompileStep, KernelError};

/// Identifies one compilation. The source hash is compared first; the full
/// text settles collisions.
pub struct KernelKey<B: Backend> {
    pub device: B::Device,
    pub function_name: String,
    pub source_hash: u64,
    pub source: String,
}

impl<B: Backend> KernelKey<B> {
    fn new(device: &B::Device, function_name: &str, source: &str) -> Self {
        KernelKey {
            device: device.clone(),
            function_name: function_name.to_string(),
            source_hash: source_hash(source),
            source: source.to_string(),
        }
    }

    /// Whether this key was built from exactly these inputs.
    pub fn matches(
        &self,
        device: &B::Device,
        function_name: &str,
        source_hash: u64,
        source: &str,
    ) -> bool {
        B::same_device(&self.device, device)
            && self.function_name == function_name
            && self.source_hash == source_hash
            && self.source == source
    }
}

/// A compiled kernel with everything needed to dispatch it.
///
/// Built in one piece by [`KernelCache::ensure_compiled`]; the derived
/// objects always belong to `key`.
pub struct CompiledKernel<B: Backend> {
    pub key: KernelKey<B>,
    pub library: B::Library,
    pub function: B::Function,
    pub pipeline: B::Pipeline,
    pub queue: B::Queue,
    /// Compile counter value at the time this entry was built.
    pub generation: u64,
}

/// Hit/compile counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub compiles: u64,
    pub failed_compiles: u64,
}

/// Single-entry, most-recently-used kernel cache.
pub struct KernelCache<B: Backend> {
    entry: Option<CompiledKernel<B>>,
    stats: CacheStats,
}

impl<B: Backend> Default for KernelCache<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> KernelCache<B> {
    pub fn new() -> Self {
        KernelCache {
            entry: None,
            stats: CacheStats::default(),
        }
    }

    /// Return the compiled kernel for this (device, function, source),
    /// compiling it first if the cached entry has a different key.
    ///
    /// A failed compilation leaves the previous entry untouched.
    pub fn ensure_compiled(
        &mut self,
        device: &B::Device,
        function_name: &str,
        source: &str,
    ) -> Result<&CompiledKernel<B>, KernelError> {
        let hash = source_hash(source);

        let compiled = match self.entry.take() {
            Some(current) if current.key.matches(device, function_name, hash, source) => {
                self.stats.hits += 1;
                debug!(
                    "[{}] kernel cache hit for '{}' (generation {})",
                    B::NAME,
                    function_name,
                    current.generation
                );
                current
            }
            previous => {
                debug!(
                    "[{}] kernel cache miss for '{}' on {} ({} bytes of source, hash {:016x})",
                    B::NAME,
                    function_name,
                    B::describe_device(device),
                    source.len(),
                    hash
                );
                match compile_kernel::<B>(device, function_name, source, self.stats.compiles + 1)
                {
                    Ok(compiled) => {
                        self.stats.compiles += 1;
                        compiled
                    }
                    Err(err) => {
                        self.stats.failed_compiles += 1;
                        warn!("[{}] compiling '{}' failed: {}", B::NAME, function_name, err);
                        self.entry = previous;
                        return Err(err);
                    }
                }
            }
        };

        Ok(self.entry.insert(compiled))
    }

    /// The cached entry, if any.
    pub fn current(&self) -> Option<&CompiledKernel<B>> {
        self.entry.as_ref()
    }

    /// Whether a call with these inputs would be a cache hit.
    pub fn is_current(&self, device: &B::Device, function_name: &str, source: &str) -> bool {
        self.entry.as_ref().is_some_and(|entry| {
            entry
                .key
                .matches(device, function_name, source_hash(source), source)
        })
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drop the cached entry, releasing its GPU objects.
    pub fn clear(&mut self) {
        self.entry = None;
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}

/// Run every compilation step; the first failure aborts.
fn compile_kernel<B: Backend>(
    device: &B::Device,
    function_name: &str,
    source: &str,
    generation: u64,
) -> Result<CompiledKernel<B>, KernelError> {
    let library = B::compile_library(device, source)
        .map_err(|e| KernelError::compile(CompileStep::Library, e))?;
    let function = B::function(&library, function_name)
        .map_err(|e| KernelError::compile(CompileStep::Function, e))?;
    let pipeline = B::pipeline(device, &function)
        .map_err(|e| KernelError::compile(CompileStep::Pipeline, e))?;
    let queue =
        B::command_queue(device).map_err(|e| KernelError::compile(CompileStep::CommandQueue, e))?;

    debug!(
        "[{}] compiled '{}' (generation {})",
        B::NAME,
        function_name,
        generation
    );

    Ok(CompiledKernel {
        key: KernelKey::new(device, function_name, source),
        library,
        function,
        pipeline,
        queue,
        generation,
    })
}

/// Hash of the kernel source text, used as the fast part of the cache key.
pub fn source_hash(source: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    source.hash(&mut hasher);
    hasher.finish()
}
