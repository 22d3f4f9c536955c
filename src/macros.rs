//! Logging macro for heap diagnostics

/// Logs through [`log`] when the heap's diagnostic level is at least `$level`.
macro_rules! diag {
  ($heap:expr, $level:ident, $($arg:tt)+) => {
    if $heap.diagnostics >= $crate::config::DiagnosticLevel::$level {
      if let Some(level) = $crate::config::DiagnosticLevel::$level.log_level() {
        log::log!(level, $($arg)+);
      }
    }
  };
}
