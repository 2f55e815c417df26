/// Router Module Index
///
/// One module per console. Paths below are relative to where `create_router` nests
/// them, and the access gate judges the full path, so every protected console must be
/// nested under the prefix the gate table names for it.

/// Anonymous endpoints: health, auth and the public catalog.
pub mod public;

/// Nested under `/customer`. The gate admits any recognized role; handlers narrow it.
pub mod customer;

/// Nested under `/admin`: the store, franchise and super consoles.
pub mod admin;

/// Nested under `/rider`. Not in the gate table; handlers require RIDER explicitly.
pub mod rider;
