/*!
# Lumen HAL

Backend-agnostic types for the Lumen hardware-abstraction layer.

Applications describe rendering work through a command/descriptor model:
GPU objects are declared by name with [`ObjectDesc`]s, commands reference
them through deterministic name hashes ([`ObjectId`]), and a [`Pipeline`]
facade forwards everything to a single [`Backend`] implementation.

## Architecture

- **Pipeline**: facade owning one backend, guarding its entry points
- **Backend**: capability-polymorphic execution target trait
- **Command / CommandList**: closed set of operations, ordered sequences
- **ObjectDesc / BufferDesc**: declarative intent for named GPU objects
- **ObjectId**: deterministic hash identity for named objects

Backend implementations provide the concrete execution path; the only
production backend is `lumen_hal_vulkan`.
*/

// Internal modules
pub mod backend;
pub mod command;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod log;
pub mod object_id;
pub mod pipeline;

#[cfg(test)]
mod mock_backend;

// Re-exports
pub use backend::{Backend, BindTarget, SignalStatus};
pub use command::{
    BlendFactor, BlendOp, ColorBlendState, ColorWriteMask, Command, CommandList, CompareOp,
    IndexKind, StencilFaceState, StencilOp, StencilState,
};
pub use config::{Config, DebugOutput, DebugSeverity};
pub use descriptor::{BufferDesc, BufferUsage, MemoryStorage, ObjectDesc};
pub use error::{Error, Result};
pub use object_id::ObjectId;
pub use pipeline::Pipeline;
