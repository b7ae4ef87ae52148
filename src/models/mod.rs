// Start of file: /src/models/mod.rs

/*
    * Domain types that cross the HTTP boundary.
*/

pub mod user;

pub use user::{User, UserChanges, UserFilters, UserId, NewUser, ValidationErrors};

// End of file: /src/models/mod.rs
