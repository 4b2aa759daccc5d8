use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::allocator::{check_size, GpuAllocator, GpuHandle, TextureDesc};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum AllocationKind {
    Buffer { len: usize },
    Texture(TextureDesc),
    Target { width: u32, height: u32 },
}

/// Bookkeeping record for one live headless allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub label: String,
    pub kind: AllocationKind,
}

#[derive(Debug, Default)]
struct State {
    next: u64,
    live: HashMap<GpuHandle, Allocation>,
    released: u64,
    fail_next: u32,
}

/// In-memory allocator.
///
/// Keeps every allocation in a table so callers can assert on what is live.
/// [`fail_next`](Self::fail_next) makes upcoming allocations fail, which is how
/// rollback paths are exercised.
#[derive(Debug, Default)]
pub struct HeadlessGpu {
    state: Mutex<State>,
}

impl HeadlessGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` allocations return [`Error::Gpu`].
    pub fn fail_next(&self, count: u32) {
        self.lock().fail_next = count;
    }

    pub fn allocation(&self, handle: GpuHandle) -> Option<Allocation> {
        self.lock().live.get(&handle).cloned()
    }

    /// Total successful releases since creation.
    pub fn released(&self) -> u64 {
        self.lock().released
    }

    fn allocate(&self, label: &str, kind: AllocationKind) -> Result<GpuHandle> {
        let mut state = self.lock();
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(Error::Gpu(format!("allocation of '{label}' refused")));
        }
        state.next += 1;
        let handle = GpuHandle(state.next);
        log::trace!("headless gpu: allocate {handle} '{label}' {kind:?}");
        state.live.insert(handle, Allocation { label: label.to_string(), kind });
        Ok(handle)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GpuAllocator for HeadlessGpu {
    fn create_buffer(&self, label: &str, contents: &[u8]) -> Result<GpuHandle> {
        if contents.is_empty() {
            return Err(Error::invalid(format!("buffer '{label}' has no contents")));
        }
        self.allocate(label, AllocationKind::Buffer { len: contents.len() })
    }

    fn create_texture(&self, label: &str, desc: TextureDesc, pixels: Option<&[u8]>) -> Result<GpuHandle> {
        desc.validate(pixels)?;
        self.allocate(label, AllocationKind::Texture(desc))
    }

    fn create_target(&self, label: &str, width: u32, height: u32) -> Result<GpuHandle> {
        check_size(width, height)?;
        self.allocate(label, AllocationKind::Target { width, height })
    }

    fn resize_target(&self, target: GpuHandle, width: u32, height: u32) -> Result<()> {
        check_size(width, height)?;
        let mut state = self.lock();
        match state.live.get_mut(&target) {
            Some(Allocation { kind: AllocationKind::Target { width: w, height: h }, .. }) => {
                *w = width;
                *h = height;
                Ok(())
            }
            Some(other) => Err(Error::TypeMismatch {
                name: other.label.clone(),
                expected: "render target",
            }),
            None => Err(Error::not_found("render target", target)),
        }
    }

    fn release(&self, handle: GpuHandle) {
        let mut state = self.lock();
        if state.live.remove(&handle).is_some() {
            state.released += 1;
        } else {
            log::warn!("headless gpu: release of unknown handle {handle}");
        }
    }

    fn live(&self) -> usize {
        self.lock().live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::TextureFormat;

    #[test]
    fn allocate_and_release() {
        let gpu = HeadlessGpu::new();
        let b = gpu.create_buffer("quad", &[0u8; 48]).unwrap();
        let t = gpu.create_target("clip", 64, 32).unwrap();
        assert_eq!(gpu.live(), 2);
        assert_eq!(gpu.allocation(b).unwrap().kind, AllocationKind::Buffer { len: 48 });

        gpu.release(b);
        gpu.release(b);
        assert_eq!(gpu.live(), 1);
        assert_eq!(gpu.released(), 1);
        assert!(gpu.allocation(t).is_some());
    }

    #[test]
    fn fail_next_refuses_then_recovers() {
        let gpu = HeadlessGpu::new();
        gpu.fail_next(1);
        assert!(matches!(gpu.create_buffer("a", &[1]), Err(Error::Gpu(_))));
        assert!(gpu.create_buffer("b", &[1]).is_ok());
        assert_eq!(gpu.live(), 1);
    }

    #[test]
    fn resize_target_updates_dimensions() {
        let gpu = HeadlessGpu::new();
        let t = gpu.create_target("clip", 10, 10).unwrap();
        gpu.resize_target(t, 20, 30).unwrap();
        assert_eq!(
            gpu.allocation(t).unwrap().kind,
            AllocationKind::Target { width: 20, height: 30 }
        );
        assert!(matches!(gpu.resize_target(t, 0, 30), Err(Error::InvalidSize { .. })));
    }

    #[test]
    fn resize_rejects_non_targets() {
        let gpu = HeadlessGpu::new();
        let tex = gpu
            .create_texture("t", TextureDesc::new(1, 1, TextureFormat::R8), Some(&[9]))
            .unwrap();
        assert!(matches!(gpu.resize_target(tex, 2, 2), Err(Error::TypeMismatch { .. })));
    }
}
