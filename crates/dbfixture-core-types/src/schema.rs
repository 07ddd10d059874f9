//! Names shared by every log line a provisioning run emits
//!
//! Log consumers and the test capture layer key on these, so they are
//! defined once here rather than spelled out at each call site.

// Fields every lifecycle event carries
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

/// Recorded on the span wrapping `initialize` and `teardown`
pub const FIELD_RUN_ID: &str = "run_id";

pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Lifecycle phases
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Operations
pub const OP_LOAD_CONFIG: &str = "load_config";
pub const OP_INITIALIZE: &str = "initialize";
pub const OP_TEARDOWN: &str = "teardown";
pub const OP_CREATE_CONTAINER: &str = "create_container";
pub const OP_STOP_CONTAINER: &str = "stop_container";
pub const OP_CREATE_CATALOG: &str = "create_catalog";
pub const OP_DROP_CATALOG: &str = "drop_catalog";

/// Every operation that logs a start/end pair
pub const LIFECYCLE_OPS: &[&str] = &[
    OP_INITIALIZE,
    OP_TEARDOWN,
    OP_CREATE_CONTAINER,
    OP_STOP_CONTAINER,
    OP_CREATE_CATALOG,
    OP_DROP_CATALOG,
];
