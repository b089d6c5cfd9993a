use std::ffi::c_void;

/// Тип callback-функции для контекста OpenCL
pub type ContextNotifyCallback = Option<
    unsafe extern "C" fn(
        errinfo: *const i8,
        private_info: *const c_void,
        cb: usize,
        user_data: *mut c_void,
    ),
>;

/// Тип callback-функции для сборки программы
pub type BuildNotifyCallback =
    Option<unsafe extern "C" fn(program: *mut c_void, user_data: *mut c_void)>;
