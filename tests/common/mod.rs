//! Fake compute provider for exercising the pipeline without hardware.
//!
//! The fake counts every created and released device object, records the
//! release order, and actually executes the staged multiplication on
//! enqueue, so end-to-end runs produce real numbers.

use opencl_matmul::opencl::api::{
    BufferHandle, BufferMode, ComputeApi, ContextHandle, DeviceClass, DeviceHandle, KernelHandle,
    PlatformHandle, ProgramHandle, QueueHandle,
};
use opencl_matmul::{ClError, Result};
use std::cell::RefCell;
use std::collections::HashMap;

/// Stage at which the fake injects a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Context,
    Program,
    Build,
    /// Fails the n-th buffer creation (0 = A, 1 = B, 2 = output).
    Buffer(usize),
    Queue,
    Kernel,
    Arg(u32),
    Enqueue,
    Read,
}

#[derive(Default)]
struct State {
    next_handle: usize,
    /// Live handle -> object kind.
    live: HashMap<usize, &'static str>,
    created: HashMap<&'static str, usize>,
    releases: Vec<&'static str>,
    programs: HashMap<usize, String>,
    buffers: HashMap<usize, (BufferMode, Vec<f32>)>,
    buffers_created: usize,
    buffer_args: HashMap<usize, HashMap<u32, usize>>,
    scalar_args: HashMap<usize, HashMap<u32, i32>>,
    last_enqueue: Option<(usize, usize)>,
}

pub struct FakeApi {
    pub platforms: usize,
    pub gpus: usize,
    pub cpus: usize,
    pub max_work_group: usize,
    pub fail_at: Option<FailPoint>,
    pub build_log: String,
    state: RefCell<State>,
}

impl FakeApi {
    /// A provider with one platform carrying one GPU and one CPU.
    pub fn healthy() -> Self {
        Self {
            platforms: 1,
            gpus: 1,
            cpus: 1,
            max_work_group: 1024,
            fail_at: None,
            build_log: String::from("fake build log: error: expected '__kernel'"),
            state: RefCell::new(State::default()),
        }
    }

    pub fn failing_at(point: FailPoint) -> Self {
        Self {
            fail_at: Some(point),
            ..Self::healthy()
        }
    }

    pub fn with_platforms(mut self, platforms: usize) -> Self {
        self.platforms = platforms;
        self
    }

    pub fn with_gpus(mut self, gpus: usize) -> Self {
        self.gpus = gpus;
        self
    }

    pub fn with_cpus(mut self, cpus: usize) -> Self {
        self.cpus = cpus;
        self
    }

    pub fn with_max_work_group(mut self, max_work_group: usize) -> Self {
        self.max_work_group = max_work_group;
        self
    }

    /// Number of device objects still alive.
    pub fn live_objects(&self) -> usize {
        self.state.borrow().live.len()
    }

    pub fn created(&self, kind: &'static str) -> usize {
        self.state.borrow().created.get(kind).copied().unwrap_or(0)
    }

    /// Object kinds in the order they were released.
    pub fn release_order(&self) -> Vec<&'static str> {
        self.state.borrow().releases.clone()
    }

    /// Geometry of the last enqueued kernel, `(global, local)`.
    pub fn last_enqueue(&self) -> Option<(usize, usize)> {
        self.state.borrow().last_enqueue
    }

    fn fails_here(&self, point: FailPoint) -> bool {
        self.fail_at == Some(point)
    }

    fn alloc(&self, kind: &'static str) -> usize {
        let mut state = self.state.borrow_mut();
        state.next_handle += 1;
        let handle = state.next_handle;
        state.live.insert(handle, kind);
        *state.created.entry(kind).or_insert(0) += 1;
        handle
    }

    fn release(&self, kind: &'static str, handle: usize) {
        let mut state = self.state.borrow_mut();
        match state.live.remove(&handle) {
            Some(live_kind) => assert_eq!(live_kind, kind, "released handle of the wrong kind"),
            None => panic!("double release of {kind} handle {handle}"),
        }
        state.releases.push(kind);
    }
}

impl ComputeApi for FakeApi {
    fn enumerate_platforms(&self) -> Result<Vec<PlatformHandle>> {
        Ok((0..self.platforms).map(|i| PlatformHandle(100 + i)).collect())
    }

    fn enumerate_devices(
        &self,
        _platform: PlatformHandle,
        class: DeviceClass,
    ) -> Result<Vec<DeviceHandle>> {
        let (base, count) = match class {
            DeviceClass::Gpu => (200, self.gpus),
            DeviceClass::Cpu => (300, self.cpus),
        };
        Ok((0..count).map(|i| DeviceHandle(base + i)).collect())
    }

    fn device_name(&self, device: DeviceHandle) -> String {
        if device.0 < 300 {
            format!("fake-gpu-{}", device.0 - 200)
        } else {
            format!("fake-cpu-{}", device.0 - 300)
        }
    }

    fn max_work_group_size(&self, _device: DeviceHandle) -> Result<usize> {
        Ok(self.max_work_group)
    }

    fn create_context(&self, _device: DeviceHandle) -> Result<ContextHandle> {
        if self.fails_here(FailPoint::Context) {
            return Err(ClError::ContextCreationFailed(-6));
        }
        Ok(ContextHandle(self.alloc("context")))
    }

    fn create_queue(&self, _context: ContextHandle, _device: DeviceHandle) -> Result<QueueHandle> {
        if self.fails_here(FailPoint::Queue) {
            return Err(ClError::QueueCreationFailed(-6));
        }
        Ok(QueueHandle(self.alloc("queue")))
    }

    fn create_program(&self, _context: ContextHandle, source: &str) -> Result<ProgramHandle> {
        if self.fails_here(FailPoint::Program) {
            return Err(ClError::CompileRejected(-30));
        }
        let handle = self.alloc("program");
        self.state
            .borrow_mut()
            .programs
            .insert(handle, source.to_string());
        Ok(ProgramHandle(handle))
    }

    fn build_program(
        &self,
        program: ProgramHandle,
        _device: DeviceHandle,
    ) -> std::result::Result<(), i32> {
        let malformed = {
            let state = self.state.borrow();
            let source = state.programs.get(&program.0).expect("unknown program");
            !source.contains("__kernel")
        };
        if self.fails_here(FailPoint::Build) || malformed {
            return Err(-11);
        }
        Ok(())
    }

    fn build_log(&self, _program: ProgramHandle, _device: DeviceHandle) -> String {
        self.build_log.clone()
    }

    fn create_buffer(
        &self,
        _context: ContextHandle,
        mode: BufferMode,
        data: &[f32],
    ) -> Result<BufferHandle> {
        let ordinal = {
            let mut state = self.state.borrow_mut();
            let ordinal = state.buffers_created;
            state.buffers_created += 1;
            ordinal
        };
        if self.fails_here(FailPoint::Buffer(ordinal)) {
            return Err(ClError::AllocationFailed {
                size: data.len() * std::mem::size_of::<f32>(),
                status: -4,
            });
        }
        let handle = self.alloc("buffer");
        self.state
            .borrow_mut()
            .buffers
            .insert(handle, (mode, data.to_vec()));
        Ok(BufferHandle(handle))
    }

    fn create_kernel(&self, _program: ProgramHandle, name: &str) -> Result<KernelHandle> {
        if self.fails_here(FailPoint::Kernel) {
            return Err(ClError::KernelCreationFailed {
                name: name.to_string(),
                status: -46,
            });
        }
        Ok(KernelHandle(self.alloc("kernel")))
    }

    fn set_buffer_arg(
        &self,
        kernel: KernelHandle,
        index: u32,
        buffer: BufferHandle,
    ) -> Result<()> {
        if self.fails_here(FailPoint::Arg(index)) {
            return Err(ClError::ArgBindFailed { index, status: -49 });
        }
        self.state
            .borrow_mut()
            .buffer_args
            .entry(kernel.0)
            .or_default()
            .insert(index, buffer.0);
        Ok(())
    }

    fn set_scalar_arg(&self, kernel: KernelHandle, index: u32, value: i32) -> Result<()> {
        if self.fails_here(FailPoint::Arg(index)) {
            return Err(ClError::ArgBindFailed { index, status: -49 });
        }
        self.state
            .borrow_mut()
            .scalar_args
            .entry(kernel.0)
            .or_default()
            .insert(index, value);
        Ok(())
    }

    /// Executes the multiplication the way the real kernel would: one
    /// work-item per output element, addressed by global id.
    fn enqueue_kernel(
        &self,
        _queue: QueueHandle,
        kernel: KernelHandle,
        global: usize,
        local: usize,
    ) -> Result<()> {
        if self.fails_here(FailPoint::Enqueue) {
            return Err(ClError::EnqueueFailed(-54));
        }
        assert!(local > 0 && global % local == 0, "invalid dispatch geometry");

        let mut state = self.state.borrow_mut();
        state.last_enqueue = Some((global, local));

        let buffer_args = state
            .buffer_args
            .get(&kernel.0)
            .expect("kernel buffer arguments not bound")
            .clone();
        let scalar_args = state
            .scalar_args
            .get(&kernel.0)
            .expect("kernel scalar arguments not bound")
            .clone();

        let (a_mode, a) = state.buffers[&buffer_args[&0]].clone();
        let (b_mode, b) = state.buffers[&buffer_args[&1]].clone();
        assert_eq!(a_mode, BufferMode::ReadOnly, "input A must be read-only");
        assert_eq!(b_mode, BufferMode::ReadOnly, "input B must be read-only");

        let inner_dim = scalar_args[&3] as usize;
        let cols_b = scalar_args[&4] as usize;

        let out_handle = buffer_args[&2];
        let (out_mode, out) = state.buffers.get_mut(&out_handle).expect("missing output");
        assert_eq!(*out_mode, BufferMode::ReadWrite, "output must be read-write");
        assert!(
            out.iter().all(|&x| x == 0.0),
            "output buffer must be zero-seeded before dispatch"
        );
        assert_eq!(out.len(), global, "one work-item per output element");

        for gid in 0..global {
            let row = gid / cols_b;
            let col = gid % cols_b;
            let mut sum = 0.0f32;
            for t in 0..inner_dim {
                sum += a[row * inner_dim + t] * b[t * cols_b + col];
            }
            out[gid] = sum;
        }
        Ok(())
    }

    fn read_buffer(
        &self,
        _queue: QueueHandle,
        buffer: BufferHandle,
        out: &mut [f32],
    ) -> Result<()> {
        if self.fails_here(FailPoint::Read) {
            return Err(ClError::ReadFailed(-5));
        }
        let state = self.state.borrow();
        assert!(
            state.last_enqueue.is_some(),
            "result read before the kernel was enqueued"
        );
        let (_, data) = state.buffers.get(&buffer.0).expect("unknown buffer");
        assert_eq!(out.len(), data.len());
        out.copy_from_slice(data);
        Ok(())
    }

    fn release_kernel(&self, kernel: KernelHandle) {
        self.release("kernel", kernel.0);
    }

    fn release_buffer(&self, buffer: BufferHandle) {
        self.release("buffer", buffer.0);
    }

    fn release_queue(&self, queue: QueueHandle) {
        self.release("queue", queue.0);
    }

    fn release_program(&self, program: ProgramHandle) {
        self.release("program", program.0);
    }

    fn release_context(&self, context: ContextHandle) {
        self.release("context", context.0);
    }
}
