//! Prelude module - commonly used test utilities.
//!
//! Use `use tollgate_test::prelude::*;` to import all essential helpers.

// Fixtures
pub use crate::{
    CallCounter, bound_method, program_fn, test_context, test_descriptor, test_token,
    test_token_with_pattern, test_validator, unvetted_host_fn, vetted_host_fn,
    vetted_object_method, vetted_resource_fn,
};

// Harness
pub use crate::{
    setup_test_logging, setup_test_logging_default, test_dir, test_file_in_dir,
    write_workspace_config,
};
