//! Pipeline facade - owns the backend and guards its entry points
//!
//! The pipeline holds at most one backend and forwards every operation to
//! it. Guard conditions are applied before the backend is reached: a
//! missing backend maps to `NotInitialized`, attaching a second backend to
//! `AlreadyInitialized`, and absent arguments (empty names, empty
//! descriptor batches) to `UnexpectedNull`.

use std::time::Duration;

use crate::backend::{Backend, SignalStatus};
use crate::command::{Command, CommandList};
use crate::descriptor::ObjectDesc;
use crate::error::{Error, Result};
use crate::hal_info;

/// Facade over a single backend instance
///
/// Single-owner handle: the backend is released deterministically when
/// the pipeline is dropped or when [`Pipeline::take_backend`] removes it.
#[derive(Default)]
pub struct Pipeline {
    backend: Option<Box<dyn Backend>>,
}

impl Pipeline {
    /// Create a pipeline with no backend attached
    pub fn new() -> Self {
        Self { backend: None }
    }

    /// Attach the backend
    ///
    /// Fails with `AlreadyInitialized` if a backend is already attached.
    pub fn set_backend(&mut self, backend: Box<dyn Backend>) -> Result<()> {
        if self.backend.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        self.backend = Some(backend);
        hal_info!("lumen::pipeline", "Backend attached");
        Ok(())
    }

    /// Detach and return the backend, if any
    pub fn take_backend(&mut self) -> Option<Box<dyn Backend>> {
        self.backend.take()
    }

    /// True if a backend is attached
    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    fn backend_mut(&mut self) -> Result<&mut dyn Backend> {
        match self.backend.as_deref_mut() {
            Some(backend) => Ok(backend),
            None => Err(Error::NotInitialized),
        }
    }

    fn check_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::UnexpectedNull("object name"));
        }
        Ok(())
    }

    // ===== OBJECT REGISTRY =====

    /// Create the objects declared by a descriptor batch
    pub fn create_objects(&mut self, descriptors: &[ObjectDesc]) -> Result<()> {
        if descriptors.is_empty() {
            return Err(Error::NothingToDo);
        }
        for desc in descriptors {
            Self::check_name(desc.name())?;
        }
        self.backend_mut()?.create_objects(descriptors)
    }

    /// Delete a named object
    pub fn delete_object(&mut self, name: &str) -> Result<()> {
        Self::check_name(name)?;
        self.backend_mut()?.delete_object(name)
    }

    // ===== BUFFER ACCESS =====

    /// Upload data into a named buffer
    pub fn upload_data(&mut self, name: &str, address: u64, data: &[u8]) -> Result<()> {
        Self::check_name(name)?;
        if data.is_empty() {
            return Err(Error::UnexpectedNull("upload data"));
        }
        self.backend_mut()?.upload_data(name, address, data)
    }

    /// Rotate a named buffer's ring
    pub fn sync_buffer(&mut self, name: &str) -> Result<()> {
        Self::check_name(name)?;
        self.backend_mut()?.sync_buffer(name)
    }

    /// Rotate every registered ring buffer
    pub fn sync_all(&mut self) -> Result<()> {
        self.backend_mut()?.sync_all()
    }

    // ===== COMMAND EXECUTION =====

    /// Execute one command
    pub fn execute_command(&mut self, command: &Command) -> Result<()> {
        self.backend_mut()?.execute_command(command)
    }

    /// Execute an ephemeral command list
    pub fn execute_temp_command_buffer(&mut self, commands: &CommandList) -> Result<()> {
        self.backend_mut()?.execute_temp_command_buffer(commands)
    }

    // ===== NAMED COMMAND LISTS =====

    /// Create an empty named command list
    pub fn create_command_buffer(&mut self, name: &str) -> Result<()> {
        Self::check_name(name)?;
        self.backend_mut()?.create_command_buffer(name)
    }

    /// Append commands to a named command list
    pub fn attach_to_command_buffer(&mut self, name: &str, commands: &CommandList) -> Result<()> {
        Self::check_name(name)?;
        self.backend_mut()?.attach_to_command_buffer(name, commands)
    }

    /// Execute a named command list
    pub fn execute_command_buffer(&mut self, name: &str) -> Result<()> {
        Self::check_name(name)?;
        self.backend_mut()?.execute_command_buffer(name)
    }

    /// Delete a named command list
    pub fn delete_command_buffer(&mut self, name: &str) -> Result<()> {
        Self::check_name(name)?;
        self.backend_mut()?.delete_command_buffer(name)
    }

    // ===== SIGNALS =====

    /// Place a named signal after all work submitted so far
    pub fn place_signal(&mut self, name: &str) -> Result<()> {
        Self::check_name(name)?;
        self.backend_mut()?.place_signal(name)
    }

    /// Query a named signal without waiting
    pub fn check_signal(&mut self, name: &str) -> SignalStatus {
        match self.backend_mut() {
            Ok(backend) => backend.check_signal(name),
            Err(_) => SignalStatus::UnknownSignal,
        }
    }

    /// Wait for a named signal with a bounded timeout
    pub fn wait_signal(&mut self, name: &str, timeout: Duration) -> SignalStatus {
        match self.backend_mut() {
            Ok(backend) => backend.wait_signal(name, timeout),
            Err(_) => SignalStatus::UnknownSignal,
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
