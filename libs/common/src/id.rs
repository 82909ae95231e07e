use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = beacon_common::id::prefixed_ulid("sig");
/// assert!(id.starts_with("sig_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Well-known ID prefixes.
pub mod prefix {
    /// A live transport (WebSocket) session.
    pub const SESSION: &str = "sig";
}
