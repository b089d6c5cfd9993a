//! Модуль для работы с OpenCL
//!
//! Содержит низкоуровневые привязки, типы и безопасную обертку-провайдер
//! поверх OpenCL API

pub mod api;
pub mod bindings;
pub mod callbacks;
pub mod types;
pub mod utils;
