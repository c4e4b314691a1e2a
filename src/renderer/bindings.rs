use anyhow::{anyhow, Result};
use std::collections::HashMap;

/// Lifecycle tag for a shared GPU resource within one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Unbound,
    Read,
    Write,
}

/// Tracks the bind state of resources that are shared across passes (the
/// cascade array, the GBuffer targets, the lit buffers). A resource that was
/// rendered to must be released before a later pass samples it, and vice
/// versa; the original convention of manually nulling shader resource views
/// becomes a checked transition here.
#[derive(Default)]
pub struct ResourceBindings {
    states: HashMap<&'static str, ResourceState>,
}

impl ResourceBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, slot: &'static str) -> ResourceState {
        self.states.get(slot).copied().unwrap_or(ResourceState::Unbound)
    }

    /// Marks `slot` as sampled by the upcoming pass. Fails while the slot is
    /// still bound as a render target or UAV.
    pub fn acquire_read(&mut self, slot: &'static str) -> Result<()> {
        match self.state(slot) {
            ResourceState::Write => {
                Err(anyhow!("resource '{slot}' is bound for write; release it before sampling"))
            }
            _ => {
                self.states.insert(slot, ResourceState::Read);
                Ok(())
            }
        }
    }

    /// Marks `slot` as a render target or UAV of the upcoming pass. Fails
    /// while any pass still holds it for reading or writing.
    pub fn acquire_write(&mut self, slot: &'static str) -> Result<()> {
        match self.state(slot) {
            ResourceState::Unbound => {
                self.states.insert(slot, ResourceState::Write);
                Ok(())
            }
            ResourceState::Read => {
                Err(anyhow!("resource '{slot}' is bound for read; release it before writing"))
            }
            ResourceState::Write => Err(anyhow!("resource '{slot}' is already bound for write")),
        }
    }

    pub fn release(&mut self, slot: &'static str) {
        self.states.insert(slot, ResourceState::Unbound);
    }

    /// Frame boundary: everything is expected to have been released; stale
    /// bindings are cleared so one bad frame cannot wedge the next.
    pub fn reset_frame(&mut self) -> Result<()> {
        let stale: Vec<&'static str> = self
            .states
            .iter()
            .filter(|(_, state)| **state != ResourceState::Unbound)
            .map(|(slot, _)| *slot)
            .collect();
        self.states.clear();
        if stale.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("resources left bound at frame end: {stale:?}"))
        }
    }
}

/// Well-known slot names used by the frame orchestrator.
pub mod slots {
    pub const CASCADE_MAPS: &str = "cascade_maps";
    pub const CASCADE_SCRATCH: &str = "cascade_scratch";
    pub const GBUFFER: &str = "gbuffer";
    pub const LIT_BUFFER: &str = "lit_buffer";
    pub const LIT_FLAT_BUFFER: &str = "lit_flat_buffer";
    pub const SCENE_DEPTH: &str = "scene_depth";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_after_write_requires_release() {
        let mut bindings = ResourceBindings::new();
        bindings.acquire_write(slots::CASCADE_MAPS).unwrap();
        assert!(bindings.acquire_read(slots::CASCADE_MAPS).is_err());
        bindings.release(slots::CASCADE_MAPS);
        assert!(bindings.acquire_read(slots::CASCADE_MAPS).is_ok());
    }

    #[test]
    fn write_while_read_is_rejected() {
        let mut bindings = ResourceBindings::new();
        bindings.acquire_read(slots::GBUFFER).unwrap();
        assert!(bindings.acquire_write(slots::GBUFFER).is_err());
    }

    #[test]
    fn repeated_reads_are_fine() {
        let mut bindings = ResourceBindings::new();
        bindings.acquire_read(slots::LIT_BUFFER).unwrap();
        assert!(bindings.acquire_read(slots::LIT_BUFFER).is_ok());
    }

    #[test]
    fn frame_reset_reports_leaks() {
        let mut bindings = ResourceBindings::new();
        bindings.acquire_write(slots::LIT_FLAT_BUFFER).unwrap();
        assert!(bindings.reset_frame().is_err());
        assert_eq!(bindings.state(slots::LIT_FLAT_BUFFER), ResourceState::Unbound);
    }
}
