//! Backend trait - capability-polymorphic execution target
//!
//! A backend owns the object registry and executes commands against the
//! GPU. Exactly one production implementation exists (the Vulkan backend);
//! optional capabilities carry default implementations so that minimal
//! backends stay minimal.

use std::time::Duration;

use crate::command::{Command, CommandList, IndexKind};
use crate::descriptor::ObjectDesc;
use crate::error::{Error, Result};

/// Result of a backend-level fence/signal query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStatus {
    /// The GPU has passed the signal
    Signalled,
    /// The GPU has not yet passed the signal
    NotSignalled,
    /// A bounded wait expired before the GPU signalled
    TimedOut,
    /// No signal with this name exists
    UnknownSignal,
}

/// Bind target for buffer bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindTarget {
    /// Vertex input binding
    Vertex,
    /// Index input binding
    Index(IndexKind),
    /// Uniform/constant binding
    Uniform,
    /// Storage binding
    Storage,
}

/// Backend execution interface
///
/// All operations are synchronous calls from the caller's thread; the
/// backend coordinates with the GPU exclusively through fences.
pub trait Backend: Send + Sync {
    // ===== OBJECT REGISTRY =====

    /// Create the objects declared by a descriptor batch
    ///
    /// Fails with `DuplicateName` if any descriptor's name is already
    /// registered. Objects created earlier in the same batch are NOT
    /// rolled back when a later descriptor fails; all-or-nothing batch
    /// creation is not guaranteed.
    fn create_objects(&mut self, descriptors: &[ObjectDesc]) -> Result<()>;

    /// Delete a named object and release its resources synchronously
    ///
    /// Fails with `UnknownName` if no object with this name exists.
    fn delete_object(&mut self, name: &str) -> Result<()>;

    // ===== BUFFER ACCESS =====

    /// Upload data into a named buffer
    ///
    /// Streaming buffers are written directly through their CPU mapping;
    /// persistent buffers go through the staging ring and a GPU-side copy.
    ///
    /// # Arguments
    ///
    /// * `name` - Buffer name
    /// * `address` - Destination byte offset (slice-relative for streaming
    ///   buffers, allocation-relative for persistent buffers)
    /// * `data` - Bytes to write
    fn upload_data(&mut self, name: &str, address: u64, data: &[u8]) -> Result<()>;

    /// Rotate a named buffer's ring and wait out the newly active slice
    ///
    /// Must be called once per logical cycle on every buffer whose active
    /// slice was written this cycle. May block unboundedly if the GPU has
    /// fallen a full ring rotation behind; the blocking is the intended
    /// backpressure mechanism.
    fn sync_buffer(&mut self, name: &str) -> Result<()>;

    /// Rotate every registered ring buffer (once-per-frame convenience)
    fn sync_all(&mut self) -> Result<()>;

    // ===== COMMAND EXECUTION =====

    /// Execute one command
    ///
    /// Draw commands resolve every named source before issuing any GPU
    /// work; an unresolved name fails with `UnknownSource` and no partial
    /// work is issued.
    fn execute_command(&mut self, command: &Command) -> Result<()>;

    /// Execute an ephemeral command list in order
    ///
    /// Stops at the first failing command and returns its status; later
    /// commands are never executed. GPU work already issued is not rolled
    /// back. An empty list yields `NothingToDo`.
    fn execute_temp_command_buffer(&mut self, commands: &CommandList) -> Result<()>;

    // ===== NAMED COMMAND LISTS =====

    /// Create an empty named command list
    fn create_command_buffer(&mut self, _name: &str) -> Result<()> {
        Err(Error::Unimplemented("create_command_buffer"))
    }

    /// Append commands to a named command list
    fn attach_to_command_buffer(&mut self, _name: &str, _commands: &CommandList) -> Result<()> {
        Err(Error::Unimplemented("attach_to_command_buffer"))
    }

    /// Execute a named command list
    fn execute_command_buffer(&mut self, _name: &str) -> Result<()> {
        Err(Error::Unimplemented("execute_command_buffer"))
    }

    /// Delete a named command list
    fn delete_command_buffer(&mut self, _name: &str) -> Result<()> {
        Err(Error::Unimplemented("delete_command_buffer"))
    }

    // ===== SIGNALS =====

    /// Place a named signal after all work submitted so far
    ///
    /// Replaces any signal previously placed under the same name.
    fn place_signal(&mut self, _name: &str) -> Result<()> {
        Err(Error::Unimplemented("place_signal"))
    }

    /// Query a named signal without waiting
    fn check_signal(&mut self, _name: &str) -> SignalStatus {
        SignalStatus::UnknownSignal
    }

    /// Wait for a named signal with a bounded timeout
    ///
    /// This is the only bounded wait in the contract; the ring-buffer
    /// synchronization wait has no timeout.
    fn wait_signal(&mut self, _name: &str, _timeout: Duration) -> SignalStatus {
        SignalStatus::UnknownSignal
    }
}
