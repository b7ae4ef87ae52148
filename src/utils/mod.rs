// Start of file: /src/utils/mod.rs

/*
    * Re-exports for utility modules: global error handling,
    * the response envelope middleware and JSON helpers.
*/

pub mod error_handler;
pub mod json;
pub mod response_handler;

// End of file: /src/utils/mod.rs
