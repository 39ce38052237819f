/// Router Module Index
///
/// Splits the routing surface by access level. Read access and the auth
/// endpoints are open; every content mutation sits behind the Writer-role
/// gate applied as a route layer in `create_router`.

/// Routes accessible to any client, authenticated or not.
pub mod public;

/// Routes requiring a valid bearer token carrying the Writer role.
pub mod writer;
