use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Frame sections bracketed by timestamp queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuPass {
    Shadow,
    Lighting,
    Composite,
}

impl GpuPass {
    pub const ALL: [GpuPass; 3] = [GpuPass::Shadow, GpuPass::Lighting, GpuPass::Composite];

    pub fn label(self) -> &'static str {
        match self {
            GpuPass::Shadow => "Shadow Pass",
            GpuPass::Lighting => "Lighting Pass",
            GpuPass::Composite => "Skybox Pass",
        }
    }

    fn index(self) -> usize {
        match self {
            GpuPass::Shadow => 0,
            GpuPass::Lighting => 1,
            GpuPass::Composite => 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GpuPassTiming {
    pub label: &'static str,
    pub duration_ms: f32,
}

const PASS_COUNT: usize = 3;
const QUERY_COUNT: u32 = (PASS_COUNT * 2) as u32;
const HISTORY_WINDOW: usize = 64;

const MAP_IDLE: u8 = 0;
const MAP_PENDING: u8 = 1;
const MAP_READY: u8 = 2;
const MAP_FAILED: u8 = 3;

/// Timestamp-query profiler for the frame's pass groups. Entirely advisory:
/// when the device lacks timestamp support, or a frame's results have not
/// landed yet, queries simply report nothing. Nothing here ever blocks the
/// host thread.
pub struct GpuTimer {
    query_set: Option<wgpu::QuerySet>,
    resolve_buffer: Option<wgpu::Buffer>,
    staging_buffer: Option<wgpu::Buffer>,
    period_ns: f32,
    map_state: Arc<AtomicU8>,
    readback_armed: bool,
    frame_has_writes: bool,
    history: [VecDeque<f32>; PASS_COUNT],
    latest: [Option<f32>; PASS_COUNT],
}

impl GpuTimer {
    /// `supported` comes from the adapter feature probe; an unsupported
    /// timer is a permanent no-op.
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, supported: bool) -> Self {
        let (query_set, resolve_buffer, staging_buffer) = if supported {
            let query_set = device.create_query_set(&wgpu::QuerySetDescriptor {
                label: Some("Frame Timestamps"),
                ty: wgpu::QueryType::Timestamp,
                count: QUERY_COUNT,
            });
            let size = QUERY_COUNT as u64 * std::mem::size_of::<u64>() as u64;
            let resolve_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Timestamp Resolve"),
                size,
                usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });
            let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Timestamp Staging"),
                size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });
            (Some(query_set), Some(resolve_buffer), Some(staging_buffer))
        } else {
            (None, None, None)
        };
        Self {
            query_set,
            resolve_buffer,
            staging_buffer,
            period_ns: queue.get_timestamp_period(),
            map_state: Arc::new(AtomicU8::new(MAP_IDLE)),
            readback_armed: false,
            frame_has_writes: false,
            history: Default::default(),
            latest: [None; PASS_COUNT],
        }
    }

    pub fn supported(&self) -> bool {
        self.query_set.is_some()
    }

    pub fn begin(&mut self, encoder: &mut wgpu::CommandEncoder, pass: GpuPass) {
        self.write(encoder, pass.index() as u32 * 2);
    }

    pub fn end(&mut self, encoder: &mut wgpu::CommandEncoder, pass: GpuPass) {
        self.write(encoder, pass.index() as u32 * 2 + 1);
    }

    fn write(&mut self, encoder: &mut wgpu::CommandEncoder, query: u32) {
        if let Some(query_set) = &self.query_set {
            encoder.write_timestamp(query_set, query);
            self.frame_has_writes = true;
        }
    }

    /// Resolves this frame's queries into the staging buffer. Skipped while
    /// a previous readback is still in flight; that frame's numbers are
    /// simply dropped.
    pub fn finish_frame(&mut self, encoder: &mut wgpu::CommandEncoder) {
        if !self.frame_has_writes {
            return;
        }
        self.frame_has_writes = false;
        if self.map_state.load(Ordering::Acquire) != MAP_IDLE || self.readback_armed {
            return;
        }
        let (Some(query_set), Some(resolve), Some(staging)) =
            (&self.query_set, &self.resolve_buffer, &self.staging_buffer)
        else {
            return;
        };
        encoder.resolve_query_set(query_set, 0..QUERY_COUNT, resolve, 0);
        encoder.copy_buffer_to_buffer(resolve, 0, staging, 0, resolve.size());
        self.readback_armed = true;
    }

    /// Drains finished readbacks. Call after submitting the frame's command
    /// buffer. `try_get_time`-style: missing results are not an error, the
    /// history just does not advance this frame.
    pub fn collect_results(&mut self, device: &wgpu::Device) {
        if self.query_set.is_none() {
            return;
        }
        if self.readback_armed {
            // The copy is in the submitted stream now; map behind it.
            self.readback_armed = false;
            if let Some(staging) = &self.staging_buffer {
                self.map_state.store(MAP_PENDING, Ordering::Release);
                let flag = self.map_state.clone();
                staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
                    let next = if result.is_ok() { MAP_READY } else { MAP_FAILED };
                    flag.store(next, Ordering::Release);
                });
            }
        }
        let _ = device.poll(wgpu::PollType::Poll);
        match self.map_state.load(Ordering::Acquire) {
            MAP_READY => {}
            MAP_FAILED => {
                self.map_state.store(MAP_IDLE, Ordering::Release);
                return;
            }
            _ => return,
        }
        let Some(staging) = &self.staging_buffer else { return };
        let mut stamps = [0u64; QUERY_COUNT as usize];
        {
            let view = staging.slice(..).get_mapped_range();
            for (i, chunk) in view.chunks_exact(8).enumerate().take(stamps.len()) {
                stamps[i] = u64::from_le_bytes(chunk.try_into().unwrap_or_default());
            }
        }
        staging.unmap();
        self.map_state.store(MAP_IDLE, Ordering::Release);

        for pass in GpuPass::ALL {
            let idx = pass.index();
            let begin = stamps[idx * 2];
            let end = stamps[idx * 2 + 1];
            if end <= begin {
                continue;
            }
            let ms = (end - begin) as f32 * self.period_ns * 1e-6;
            self.latest[idx] = Some(ms);
            let history = &mut self.history[idx];
            history.push_back(ms);
            while history.len() > HISTORY_WINDOW {
                history.pop_front();
            }
        }
    }

    /// Most recent duration for `pass`, if any frame has reported one.
    pub fn try_get_time(&self, pass: GpuPass) -> Option<f32> {
        self.latest[pass.index()]
    }

    /// Rolling average over the history window; 0 until results arrive.
    pub fn average_time_ms(&self, pass: GpuPass) -> f32 {
        let history = &self.history[pass.index()];
        if history.is_empty() {
            return 0.0;
        }
        history.iter().sum::<f32>() / history.len() as f32
    }

    /// Drops accumulated history, e.g. when a settings change invalidates
    /// comparisons between frames.
    pub fn reset(&mut self) {
        for history in &mut self.history {
            history.clear();
        }
        self.latest = [None; PASS_COUNT];
    }

    pub fn timings(&self) -> Vec<GpuPassTiming> {
        GpuPass::ALL
            .iter()
            .filter_map(|&pass| {
                self.try_get_time(pass)
                    .map(|_| GpuPassTiming { label: pass.label(), duration_ms: self.average_time_ms(pass) })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_indices_are_disjoint() {
        let mut seen = std::collections::HashSet::new();
        for pass in GpuPass::ALL {
            assert!(seen.insert(pass.index()));
            assert!(((pass.index() * 2 + 1) as u32) < QUERY_COUNT);
        }
    }
}
