//! Structured diagnostics for the block codec.
//!
//! The `log_metric!` macro emits one key/value line per event through the `log`
//! facade at `trace` level under the `chwire::metric` target. Calls are compiled
//! out of release builds entirely.

/// Logs a structured key-value metric line, only in debug builds.
///
/// # Example
/// ```
/// use chwire::log_metric;
/// let rows = 10;
/// log_metric!("event"="write_block", "rows"=&rows);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        #[cfg(debug_assertions)]
        {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            log::trace!(target: "chwire::metric", "CHWIRE_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}
