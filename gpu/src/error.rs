//! Error types for kernel invocation.
//!
//! Every failure aborts the invocation and is returned to the caller; nothing
//! is retried. The variant tells the caller which phase failed.

use std::fmt;

use thiserror::Error;

/// Coarse classification of a [`KernelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Compilation,
    Dispatch,
    Execution,
    Config,
}

/// Input contract violations, detected before any GPU work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("function name is empty")]
    EmptyFunctionName,

    #[error("function name {0:?} must be a single line without control characters")]
    MalformedFunctionName(String),

    #[error("kernel source is empty")]
    EmptySource,

    #[error("no kernel arguments given; the first buffer sizes the dispatch grid")]
    NoArguments,

    #[error("argument {index} is a {found}, not a device buffer")]
    NotADeviceBuffer { index: usize, found: &'static str },

    #[error("buffer {index} lives on device {found}, expected {expected} (device of buffer 0)")]
    DeviceMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("element count of shape {shape:?} overflows usize")]
    ElementCountOverflow { shape: Vec<usize> },
}

/// Sub-step of a kernel compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileStep {
    Library,
    Function,
    Pipeline,
    CommandQueue,
}

impl fmt::Display for CompileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompileStep::Library => "library compilation",
            CompileStep::Function => "function lookup",
            CompileStep::Pipeline => "pipeline creation",
            CompileStep::CommandQueue => "command queue creation",
        };
        f.write_str(name)
    }
}

/// Sub-step of encoding and submitting one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchStep {
    CommandBuffer,
    Encoder,
    BindPipeline,
    BindBuffer { slot: usize },
    DispatchGrid,
    EndEncoding,
    Commit,
}

impl fmt::Display for DispatchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchStep::CommandBuffer => f.write_str("command buffer creation"),
            DispatchStep::Encoder => f.write_str("compute encoder creation"),
            DispatchStep::BindPipeline => f.write_str("pipeline bind"),
            DispatchStep::BindBuffer { slot } => write!(f, "buffer bind at slot {}", slot),
            DispatchStep::DispatchGrid => f.write_str("dispatch grid sizing"),
            DispatchStep::EndEncoding => f.write_str("end encoding"),
            DispatchStep::Commit => f.write_str("commit"),
        }
    }
}

/// Error returned by [`Dispatcher::invoke`](crate::Dispatcher::invoke) and the
/// kernel cache.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("invalid kernel arguments: {0}")]
    Validation(#[from] ValidationError),

    #[error("{step} failed: {message}")]
    Compile { step: CompileStep, message: String },

    #[error("{step} failed: {message}")]
    Dispatch { step: DispatchStep, message: String },

    /// The GPU accepted the work but reported an error while running it.
    #[error("kernel execution failed: {0}")]
    Execution(String),

    #[error("invalid dispatch options: {0}")]
    Config(String),
}

impl KernelError {
    pub(crate) fn compile(step: CompileStep, message: impl Into<String>) -> Self {
        KernelError::Compile {
            step,
            message: message.into(),
        }
    }

    pub(crate) fn dispatch(step: DispatchStep, message: impl Into<String>) -> Self {
        KernelError::Dispatch {
            step,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            KernelError::Validation(_) => ErrorKind::Validation,
            KernelError::Compile { .. } => ErrorKind::Compilation,
            KernelError::Dispatch { .. } => ErrorKind::Dispatch,
            KernelError::Execution(_) => ErrorKind::Execution,
            KernelError::Config(_) => ErrorKind::Config,
        }
    }
}

/// Specialized Result type for kernel invocation.
pub type Result<T> = std::result::Result<T, KernelError>;
