//! Lifecycle logging macros
//!
//! An operation logs one `start` event and then exactly one of `end` or
//! `end_error`. The closing macros take the `Instant` captured at the start
//! and derive `duration_ms` from it. Extra `field = value` pairs are passed
//! straight through to `tracing`.

/// Log the start of an operation
///
/// ```
/// # use dbfixture_core::log_op_start;
/// log_op_start!("create_container");
/// log_op_start!("create_container", platform = "linux");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)+)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::schema::EVENT_START
            $(, $($field)+)?
        )
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use dbfixture_core::log_op_end;
/// let started = std::time::Instant::now();
/// log_op_end!("stop_container", started = started, container_id = "abc123");
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, started = $started:expr $(, $($field:tt)+)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::schema::EVENT_END,
            duration_ms = $crate::logging_facility::elapsed_ms($started)
            $(, $($field)+)?
        )
    };
}

/// Log a failed operation
///
/// Takes the error by reference and logs it as an `ExError`, so the event
/// carries the stable kind and code alongside the message.
///
/// ```
/// # use dbfixture_core::{log_op_error, errors::ProvisionError};
/// let started = std::time::Instant::now();
/// let err = ProvisionError::CatalogInUse { catalog: "SampleDB".to_string() };
/// log_op_error!("drop_catalog", &err, started = started);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, started = $started:expr $(, $($field:tt)+)?) => {{
        let ex_err: $crate::errors::ExError = ::std::clone::Clone::clone($err).into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::schema::EVENT_END_ERROR,
            duration_ms = $crate::logging_facility::elapsed_ms($started),
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            err = %ex_err
            $(, $($field)+)?
        );
    }};
}
