//! 控制台日志
//!
//! 在 wasm32 目标上写入浏览器控制台，其它目标（命令行工具、单元测试）写入标准错误。

/// 普通日志
#[macro_export]
macro_rules! console_log {
    ($($arg:tt)*) => {
        $crate::logging::log(&format!($($arg)*))
    };
}

/// 警告日志
#[macro_export]
macro_rules! console_warn {
    ($($arg:tt)*) => {
        $crate::logging::warn(&format!($($arg)*))
    };
}

/// 错误日志
#[macro_export]
macro_rules! console_error {
    ($($arg:tt)*) => {
        $crate::logging::error(&format!($($arg)*))
    };
}

#[cfg(target_arch = "wasm32")]
pub fn log(message: &str) {
    web_sys::console::log_1(&wasm_bindgen::JsValue::from_str(message));
}

#[cfg(target_arch = "wasm32")]
pub fn warn(message: &str) {
    web_sys::console::warn_1(&wasm_bindgen::JsValue::from_str(message));
}

#[cfg(target_arch = "wasm32")]
pub fn error(message: &str) {
    web_sys::console::error_1(&wasm_bindgen::JsValue::from_str(message));
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log(message: &str) {
    eprintln!("{}", message);
}

#[cfg(not(target_arch = "wasm32"))]
pub fn warn(message: &str) {
    eprintln!("警告: {}", message);
}

#[cfg(not(target_arch = "wasm32"))]
pub fn error(message: &str) {
    eprintln!("错误: {}", message);
}
