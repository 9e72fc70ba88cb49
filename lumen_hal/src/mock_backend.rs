//! Mock Backend for unit tests (no GPU required)
//!
//! Records every operation it receives so tests can assert on dispatch
//! order, and can be scripted to fail a specific command index to test
//! the stop-at-first-failure contract.

use std::time::Duration;

use rustc_hash::FxHashSet;

use crate::backend::{Backend, SignalStatus};
use crate::command::{Command, CommandList};
use crate::descriptor::ObjectDesc;
use crate::error::{Error, Result};
use crate::object_id::ObjectId;

/// Mock backend that records operations without touching a GPU
#[derive(Default)]
pub struct MockBackend {
    /// Operation log, one entry per received call
    pub calls: Vec<String>,
    /// Registered object names
    pub objects: FxHashSet<ObjectId>,
    /// Commands executed so far
    pub executed: usize,
    /// Fail the command at this zero-based index with `BrokenSource`
    pub fail_at: Option<usize>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn describe(command: &Command) -> &'static str {
        match command {
            Command::Draw { .. } => "draw",
            Command::DrawIndexed { .. } => "draw_indexed",
            Command::DrawIndirect { .. } => "draw_indirect",
            Command::DrawIndexedIndirect { .. } => "draw_indexed_indirect",
            Command::SetBlending(_) => "set_blending",
            Command::SetStencil(_) => "set_stencil",
        }
    }
}

impl Backend for MockBackend {
    fn create_objects(&mut self, descriptors: &[ObjectDesc]) -> Result<()> {
        for desc in descriptors {
            let id = ObjectId::from_name(desc.name());
            if !self.objects.insert(id) {
                return Err(Error::DuplicateName(desc.name().to_string()));
            }
            self.calls.push(format!("create:{}", desc.name()));
        }
        Ok(())
    }

    fn delete_object(&mut self, name: &str) -> Result<()> {
        let id = ObjectId::from_name(name);
        if !self.objects.remove(&id) {
            return Err(Error::UnknownName(name.to_string()));
        }
        self.calls.push(format!("delete:{}", name));
        Ok(())
    }

    fn upload_data(&mut self, name: &str, address: u64, data: &[u8]) -> Result<()> {
        self.calls.push(format!("upload:{}:{}:{}", name, address, data.len()));
        Ok(())
    }

    fn sync_buffer(&mut self, name: &str) -> Result<()> {
        self.calls.push(format!("sync:{}", name));
        Ok(())
    }

    fn sync_all(&mut self) -> Result<()> {
        self.calls.push("sync_all".to_string());
        Ok(())
    }

    fn execute_command(&mut self, command: &Command) -> Result<()> {
        let index = self.executed;
        self.executed += 1;
        if self.fail_at == Some(index) {
            return Err(Error::BrokenSource(format!("scripted failure at {}", index)));
        }
        self.calls.push(Self::describe(command).to_string());
        Ok(())
    }

    fn execute_temp_command_buffer(&mut self, commands: &CommandList) -> Result<()> {
        if commands.is_empty() {
            return Err(Error::NothingToDo);
        }
        for command in commands {
            self.execute_command(command)?;
        }
        Ok(())
    }

    fn place_signal(&mut self, name: &str) -> Result<()> {
        self.calls.push(format!("signal:{}", name));
        Ok(())
    }

    fn check_signal(&mut self, _name: &str) -> SignalStatus {
        SignalStatus::NotSignalled
    }

    fn wait_signal(&mut self, _name: &str, _timeout: Duration) -> SignalStatus {
        SignalStatus::TimedOut
    }
}
