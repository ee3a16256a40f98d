//! 日志后端抽象
//!
//! agent 通过 [`LoggerFactory`] 为每个子组件创建具名日志器，
//! 默认实现转发到 `tracing`。

use std::str::FromStr;
use std::sync::Arc;
use tracing::Level;

/// 具名日志器
pub trait Logger: Send + Sync {
    fn trace(&self, msg: &str);
    fn debug(&self, msg: &str);
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// 日志器工厂
///
/// `scope` 通常是子组件名，例如 "ice" 或 "sctp"
pub trait LoggerFactory: Send + Sync {
    fn new_logger(&self, scope: &str) -> Arc<dyn Logger>;
}

/// 基于 tracing 的日志器
#[derive(Debug, Clone)]
pub struct TracingLogger {
    scope: String,
}

impl TracingLogger {
    pub fn new(scope: impl Into<String>) -> Self {
        Self { scope: scope.into() }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl Logger for TracingLogger {
    fn trace(&self, msg: &str) {
        tracing::trace!(scope = %self.scope, "{}", msg);
    }

    fn debug(&self, msg: &str) {
        tracing::debug!(scope = %self.scope, "{}", msg);
    }

    fn info(&self, msg: &str) {
        tracing::info!(scope = %self.scope, "{}", msg);
    }

    fn warn(&self, msg: &str) {
        tracing::warn!(scope = %self.scope, "{}", msg);
    }

    fn error(&self, msg: &str) {
        tracing::error!(scope = %self.scope, "{}", msg);
    }
}

/// 默认日志器工厂 (tracing)
#[derive(Debug, Clone, Default)]
pub struct TracingLoggerFactory;

impl LoggerFactory for TracingLoggerFactory {
    fn new_logger(&self, scope: &str) -> Arc<dyn Logger> {
        Arc::new(TracingLogger::new(scope))
    }
}

/// 丢弃所有日志
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn trace(&self, _msg: &str) {}
    fn debug(&self, _msg: &str) {}
    fn info(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
}

/// 空日志器工厂
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLoggerFactory;

impl LoggerFactory for NoopLoggerFactory {
    fn new_logger(&self, _scope: &str) -> Arc<dyn Logger> {
        Arc::new(NoopLogger)
    }
}

/// 根据 verbose 级别选择日志级别 (0=warn, 1=info, 2=debug, 3=trace)
pub fn level_from_verbose(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// 初始化 tracing 输出
///
/// 命令行 verbose 优先，否则使用配置文件中的级别
pub fn init_logging(verbose: Option<u8>, config_level: &str) {
    let level = match verbose {
        Some(v) => level_from_verbose(v),
        None => Level::from_str(config_level).unwrap_or(Level::INFO),
    };

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(level)
        .init();
}
