//! Провайдер OpenCL API
//!
//! Трейт [`ComputeApi`] закрывает собой все обращения к OpenCL: перечисление
//! платформ и устройств, создание объектов, привязку аргументов, запуск ядра
//! и чтение результата. Боевая реализация [`OpenClApi`] зовёт низкоуровневые
//! привязки; тесты подставляют счётный фиктивный провайдер и проверяют
//! конвейер без реального оборудования.

use crate::error::{ClError, Result};
use crate::opencl::bindings::*;
use crate::opencl::types::*;
use crate::opencl::utils::to_c_string;
use crate::{cl_check, cl_create};
use std::ffi::c_void;
use std::ptr;

/// Класс устройства при перечислении
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Gpu,
    Cpu,
}

/// Режим доступа устройства к буферу
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferMode {
    /// Ядро только читает буфер
    ReadOnly,
    /// Ядро читает и пишет буфер
    ReadWrite,
}

/// Непрозрачная ссылка на платформу
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformHandle(pub usize);

/// Непрозрачная ссылка на устройство; никогда не освобождается
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub usize);

/// Непрозрачная ссылка на контекст
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub usize);

/// Непрозрачная ссылка на очередь команд
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueHandle(pub usize);

/// Непрозрачная ссылка на программу
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub usize);

/// Непрозрачная ссылка на буфер устройства
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub usize);

/// Непрозрачная ссылка на ядро
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelHandle(pub usize);

/// Интерфейс провайдера вычислительного API
///
/// Очередь команд обязана исполнять операции в порядке постановки: чтение
/// результата, поставленное после запуска ядра, видит его вывод без
/// дополнительной синхронизации.
pub trait ComputeApi {
    /// Перечисляет доступные платформы; пустой список означает, что
    /// платформ нет
    fn enumerate_platforms(&self) -> Result<Vec<PlatformHandle>>;

    /// Перечисляет устройства данного класса; пустой список означает, что
    /// устройств такого класса нет
    fn enumerate_devices(
        &self,
        platform: PlatformHandle,
        class: DeviceClass,
    ) -> Result<Vec<DeviceHandle>>;

    /// Человекочитаемое имя устройства, для журнала
    fn device_name(&self, device: DeviceHandle) -> String;

    /// Максимальный размер рабочей группы устройства
    fn max_work_group_size(&self, device: DeviceHandle) -> Result<usize>;

    fn create_context(&self, device: DeviceHandle) -> Result<ContextHandle>;

    fn create_queue(&self, context: ContextHandle, device: DeviceHandle) -> Result<QueueHandle>;

    /// Создаёт программу из исходного текста, без сборки
    fn create_program(&self, context: ContextHandle, source: &str) -> Result<ProgramHandle>;

    /// Собирает программу; при ошибке возвращает сырой статус, чтобы
    /// вызывающий успел забрать лог сборки
    fn build_program(
        &self,
        program: ProgramHandle,
        device: DeviceHandle,
    ) -> std::result::Result<(), cl_int>;

    /// Лог сборки программы; если лог недоступен, возвращает заглушку
    /// с причиной
    fn build_log(&self, program: ProgramHandle, device: DeviceHandle) -> String;

    /// Создаёт буфер и сразу копирует в него данные хоста
    fn create_buffer(
        &self,
        context: ContextHandle,
        mode: BufferMode,
        data: &[f32],
    ) -> Result<BufferHandle>;

    fn create_kernel(&self, program: ProgramHandle, name: &str) -> Result<KernelHandle>;

    fn set_buffer_arg(&self, kernel: KernelHandle, index: u32, buffer: BufferHandle)
        -> Result<()>;

    fn set_scalar_arg(&self, kernel: KernelHandle, index: u32, value: i32) -> Result<()>;

    /// Ставит ядро в очередь: одномерный диапазон `global`, группы по `local`
    fn enqueue_kernel(
        &self,
        queue: QueueHandle,
        kernel: KernelHandle,
        global: usize,
        local: usize,
    ) -> Result<()>;

    /// Блокирующее чтение ровно `out.len()` элементов из буфера
    fn read_buffer(&self, queue: QueueHandle, buffer: BufferHandle, out: &mut [f32])
        -> Result<()>;

    fn release_kernel(&self, kernel: KernelHandle);
    fn release_buffer(&self, buffer: BufferHandle);
    fn release_queue(&self, queue: QueueHandle);
    fn release_program(&self, program: ProgramHandle);
    fn release_context(&self, context: ContextHandle);
}

/// Боевой провайдер поверх системной библиотеки OpenCL
pub struct OpenClApi;

impl OpenClApi {
    fn device_type_of(class: DeviceClass) -> cl_device_type {
        match class {
            DeviceClass::Gpu => CL_DEVICE_TYPE_GPU,
            DeviceClass::Cpu => CL_DEVICE_TYPE_CPU,
        }
    }
}

impl ComputeApi for OpenClApi {
    fn enumerate_platforms(&self) -> Result<Vec<PlatformHandle>> {
        let mut num_platforms: cl_uint = 0;
        let status = unsafe { clGetPlatformIDs(0, ptr::null_mut(), &mut num_platforms) };
        if status != CL_SUCCESS || num_platforms == 0 {
            return Ok(Vec::new());
        }

        let mut platform_ids = vec![ptr::null_mut(); num_platforms as usize];
        cl_check!(
            unsafe {
                clGetPlatformIDs(num_platforms, platform_ids.as_mut_ptr(), &mut num_platforms)
            },
            |_| ClError::NoPlatform
        )?;

        Ok(platform_ids
            .into_iter()
            .map(|p| PlatformHandle(p as usize))
            .collect())
    }

    fn enumerate_devices(
        &self,
        platform: PlatformHandle,
        class: DeviceClass,
    ) -> Result<Vec<DeviceHandle>> {
        let device_type = Self::device_type_of(class);
        let mut num_devices: cl_uint = 0;
        let status = unsafe {
            clGetDeviceIDs(
                platform.0 as cl_platform_id,
                device_type,
                0,
                ptr::null_mut(),
                &mut num_devices,
            )
        };
        if status == CL_DEVICE_NOT_FOUND || num_devices == 0 {
            return Ok(Vec::new());
        }
        if status != CL_SUCCESS {
            return Err(ClError::DeviceQueryFailed(status));
        }

        let mut device_ids = vec![ptr::null_mut(); num_devices as usize];
        cl_check!(
            unsafe {
                clGetDeviceIDs(
                    platform.0 as cl_platform_id,
                    device_type,
                    num_devices,
                    device_ids.as_mut_ptr(),
                    &mut num_devices,
                )
            },
            ClError::DeviceQueryFailed
        )?;

        Ok(device_ids
            .into_iter()
            .map(|d| DeviceHandle(d as usize))
            .collect())
    }

    fn device_name(&self, device: DeviceHandle) -> String {
        let mut size = 0usize;
        let status = unsafe {
            clGetDeviceInfo(
                device.0 as cl_device_id,
                CL_DEVICE_NAME,
                0,
                ptr::null_mut(),
                &mut size,
            )
        };
        if status != CL_SUCCESS || size == 0 {
            return String::from("unknown device");
        }

        let mut name = vec![0u8; size];
        let status = unsafe {
            clGetDeviceInfo(
                device.0 as cl_device_id,
                CL_DEVICE_NAME,
                size,
                name.as_mut_ptr() as *mut c_void,
                ptr::null_mut(),
            )
        };
        if status != CL_SUCCESS {
            return String::from("unknown device");
        }

        String::from_utf8_lossy(&name)
            .trim_end_matches('\0')
            .to_string()
    }

    fn max_work_group_size(&self, device: DeviceHandle) -> Result<usize> {
        let mut max_work_group_size = 0usize;
        cl_check!(
            unsafe {
                clGetDeviceInfo(
                    device.0 as cl_device_id,
                    CL_DEVICE_MAX_WORK_GROUP_SIZE,
                    std::mem::size_of::<usize>(),
                    &mut max_work_group_size as *mut _ as *mut c_void,
                    ptr::null_mut(),
                )
            },
            ClError::DeviceQueryFailed
        )?;
        Ok(max_work_group_size)
    }

    fn create_context(&self, device: DeviceHandle) -> Result<ContextHandle> {
        let dev = device.0 as cl_device_id;
        let mut status: cl_int = CL_SUCCESS;
        let context = cl_create!(
            unsafe { clCreateContext(ptr::null(), 1, &dev, None, ptr::null_mut(), &mut status) },
            status,
            ClError::ContextCreationFailed
        )?;
        Ok(ContextHandle(context as usize))
    }

    fn create_queue(&self, context: ContextHandle, device: DeviceHandle) -> Result<QueueHandle> {
        let mut status: cl_int = CL_SUCCESS;
        let queue = cl_create!(
            unsafe {
                clCreateCommandQueue(
                    context.0 as cl_context,
                    device.0 as cl_device_id,
                    0,
                    &mut status,
                )
            },
            status,
            ClError::QueueCreationFailed
        )?;
        Ok(QueueHandle(queue as usize))
    }

    fn create_program(&self, context: ContextHandle, source: &str) -> Result<ProgramHandle> {
        let source_ptr = source.as_ptr() as *const i8;
        let source_len = source.len();
        let mut status: cl_int = CL_SUCCESS;
        let program = cl_create!(
            unsafe {
                clCreateProgramWithSource(
                    context.0 as cl_context,
                    1,
                    &source_ptr,
                    &source_len,
                    &mut status,
                )
            },
            status,
            ClError::CompileRejected
        )?;
        Ok(ProgramHandle(program as usize))
    }

    fn build_program(
        &self,
        program: ProgramHandle,
        device: DeviceHandle,
    ) -> std::result::Result<(), cl_int> {
        let dev = device.0 as cl_device_id;
        let status = unsafe {
            clBuildProgram(
                program.0 as cl_program,
                1,
                &dev,
                ptr::null(),
                None,
                ptr::null_mut(),
            )
        };
        if status == CL_SUCCESS {
            Ok(())
        } else {
            Err(status)
        }
    }

    fn build_log(&self, program: ProgramHandle, device: DeviceHandle) -> String {
        let mut log_size = 0usize;
        let status = unsafe {
            clGetProgramBuildInfo(
                program.0 as cl_program,
                device.0 as cl_device_id,
                CL_PROGRAM_BUILD_LOG,
                0,
                ptr::null_mut(),
                &mut log_size,
            )
        };
        if status != CL_SUCCESS || log_size == 0 {
            return format!("build log unavailable (status {})", status);
        }

        let mut log = vec![0u8; log_size];
        let status = unsafe {
            clGetProgramBuildInfo(
                program.0 as cl_program,
                device.0 as cl_device_id,
                CL_PROGRAM_BUILD_LOG,
                log_size,
                log.as_mut_ptr() as *mut c_void,
                ptr::null_mut(),
            )
        };
        if status != CL_SUCCESS {
            return format!("build log unavailable (status {})", status);
        }

        String::from_utf8_lossy(&log)
            .trim_end_matches('\0')
            .to_string()
    }

    fn create_buffer(
        &self,
        context: ContextHandle,
        mode: BufferMode,
        data: &[f32],
    ) -> Result<BufferHandle> {
        let mode_flags = match mode {
            BufferMode::ReadOnly => CL_MEM_READ_ONLY,
            BufferMode::ReadWrite => CL_MEM_READ_WRITE,
        };
        let flags = mode_flags | CL_MEM_COPY_HOST_PTR;
        let size = data.len() * std::mem::size_of::<f32>();

        let mut status: cl_int = CL_SUCCESS;
        let buffer = cl_create!(
            unsafe {
                clCreateBuffer(
                    context.0 as cl_context,
                    flags,
                    size,
                    data.as_ptr() as *mut c_void,
                    &mut status,
                )
            },
            status,
            |status| ClError::AllocationFailed { size, status }
        )?;
        Ok(BufferHandle(buffer as usize))
    }

    fn create_kernel(&self, program: ProgramHandle, name: &str) -> Result<KernelHandle> {
        let c_name = to_c_string(name);
        let mut status: cl_int = CL_SUCCESS;
        let kernel = cl_create!(
            unsafe { clCreateKernel(program.0 as cl_program, c_name.as_ptr(), &mut status) },
            status,
            |status| ClError::KernelCreationFailed {
                name: name.to_string(),
                status,
            }
        )?;
        Ok(KernelHandle(kernel as usize))
    }

    fn set_buffer_arg(
        &self,
        kernel: KernelHandle,
        index: u32,
        buffer: BufferHandle,
    ) -> Result<()> {
        let mem = buffer.0 as cl_mem;
        cl_check!(
            unsafe {
                clSetKernelArg(
                    kernel.0 as cl_kernel,
                    index,
                    std::mem::size_of::<cl_mem>(),
                    &mem as *const _ as *const c_void,
                )
            },
            |status| ClError::ArgBindFailed { index, status }
        )
    }

    fn set_scalar_arg(&self, kernel: KernelHandle, index: u32, value: i32) -> Result<()> {
        cl_check!(
            unsafe {
                clSetKernelArg(
                    kernel.0 as cl_kernel,
                    index,
                    std::mem::size_of::<i32>(),
                    &value as *const _ as *const c_void,
                )
            },
            |status| ClError::ArgBindFailed { index, status }
        )
    }

    fn enqueue_kernel(
        &self,
        queue: QueueHandle,
        kernel: KernelHandle,
        global: usize,
        local: usize,
    ) -> Result<()> {
        cl_check!(
            unsafe {
                clEnqueueNDRangeKernel(
                    queue.0 as cl_command_queue,
                    kernel.0 as cl_kernel,
                    1,
                    ptr::null(),
                    &global,
                    &local,
                    0,
                    ptr::null(),
                    ptr::null_mut(),
                )
            },
            ClError::EnqueueFailed
        )
    }

    fn read_buffer(
        &self,
        queue: QueueHandle,
        buffer: BufferHandle,
        out: &mut [f32],
    ) -> Result<()> {
        cl_check!(
            unsafe {
                clEnqueueReadBuffer(
                    queue.0 as cl_command_queue,
                    buffer.0 as cl_mem,
                    CL_TRUE,
                    0,
                    out.len() * std::mem::size_of::<f32>(),
                    out.as_mut_ptr() as *mut c_void,
                    0,
                    ptr::null(),
                    ptr::null_mut(),
                )
            },
            ClError::ReadFailed
        )
    }

    fn release_kernel(&self, kernel: KernelHandle) {
        unsafe {
            clReleaseKernel(kernel.0 as cl_kernel);
        }
    }

    fn release_buffer(&self, buffer: BufferHandle) {
        unsafe {
            clReleaseMemObject(buffer.0 as cl_mem);
        }
    }

    fn release_queue(&self, queue: QueueHandle) {
        unsafe {
            clReleaseCommandQueue(queue.0 as cl_command_queue);
        }
    }

    fn release_program(&self, program: ProgramHandle) {
        unsafe {
            clReleaseProgram(program.0 as cl_program);
        }
    }

    fn release_context(&self, context: ContextHandle) {
        unsafe {
            clReleaseContext(context.0 as cl_context);
        }
    }
}
