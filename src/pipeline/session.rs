//! Сессия одного запуска конвейера
//!
//! Сессия владеет всеми объектами устройства одного запуска и отвечает за
//! их освобождение в строгом обратном порядке зависимостей:
//! ядро → буферы (A, B, результат) → очередь → программа → контекст.
//! Освобождение привязано к выходу из области видимости, поэтому
//! выполняется и на ранних путях с ошибкой. Само устройство сессии не
//! принадлежит и никогда не освобождается.

use crate::error::Result;
use crate::opencl::api::{
    ComputeApi, ContextHandle, DeviceHandle, KernelHandle, ProgramHandle, QueueHandle,
};
use crate::pipeline::buffers::{self, StagedBuffers};
use crate::pipeline::dispatch::DispatchPlan;
use crate::pipeline::program;
use tracing::debug;

/// Объекты устройства одного запуска умножения
pub struct PipelineSession<'a> {
    api: &'a dyn ComputeApi,
    context: ContextHandle,
    program: ProgramHandle,
    buffers: StagedBuffers,
    queue: QueueHandle,
    kernel: KernelHandle,
}

impl<'a> PipelineSession<'a> {
    /// Захватывает объекты устройства в порядке зависимостей:
    /// контекст → программа → буферы → очередь → ядро
    ///
    /// При сбое на любой стадии уже захваченные объекты освобождаются до
    /// возврата ошибки, вперёд конвейер не движется.
    pub fn new(
        api: &'a dyn ComputeApi,
        device: DeviceHandle,
        source: &str,
        entry: &str,
        flat_a: &[f32],
        flat_b: &[f32],
        out_len: usize,
    ) -> Result<Self> {
        let context = api.create_context(device)?;

        let program = match program::build_program(api, context, device, source) {
            Ok(program) => program,
            Err(e) => {
                api.release_context(context);
                return Err(e);
            }
        };

        let staged = match buffers::stage_buffers(api, context, flat_a, flat_b, out_len) {
            Ok(staged) => staged,
            Err(e) => {
                api.release_program(program);
                api.release_context(context);
                return Err(e);
            }
        };

        let queue = match api.create_queue(context, device) {
            Ok(queue) => queue,
            Err(e) => {
                staged.release(api);
                api.release_program(program);
                api.release_context(context);
                return Err(e);
            }
        };

        let kernel = match api.create_kernel(program, entry) {
            Ok(kernel) => kernel,
            Err(e) => {
                staged.release(api);
                api.release_queue(queue);
                api.release_program(program);
                api.release_context(context);
                return Err(e);
            }
        };

        debug!("pipeline session acquired all device objects");
        Ok(Self {
            api,
            context,
            program,
            buffers: staged,
            queue,
            kernel,
        })
    }

    pub fn kernel(&self) -> KernelHandle {
        self.kernel
    }

    pub fn buffers(&self) -> &StagedBuffers {
        &self.buffers
    }

    /// Ставит ядро в очередь и блокирующе читает результат
    ///
    /// Постановка сама по себе не означает завершения: завершение
    /// наблюдается чтением, которое идёт в той же очереди следом и
    /// опирается на её порядок исполнения. Отмены и таймаута нет: хост
    /// ждёт, пока устройство не ответит.
    pub fn run(&self, plan: &DispatchPlan, host_out: &mut [f32]) -> Result<()> {
        self.api
            .enqueue_kernel(self.queue, self.kernel, plan.global, plan.local)?;
        buffers::read_back(self.api, self.queue, self.buffers.out, host_out)
    }
}

impl Drop for PipelineSession<'_> {
    fn drop(&mut self) {
        self.api.release_kernel(self.kernel);
        self.buffers.release(self.api);
        self.api.release_queue(self.queue);
        self.api.release_program(self.program);
        self.api.release_context(self.context);
        debug!("pipeline session released all device objects");
    }
}
