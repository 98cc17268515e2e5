//! Config-or-message value resolution.
//!
//! Every adapter looks up its inputs the same way: a value set in the node's
//! own configuration wins, otherwise the corresponding message field is used.

/// Ordered lookup: `config` if set, else `message`.
pub fn resolve<T>(config: Option<T>, message: Option<T>) -> Option<T> {
    config.or(message)
}

/// Lift a node-level boolean option into the [`resolve`] order.
///
/// An unchecked option is "not configured" rather than "configured as
/// false", so a message can still turn the behaviour on.
pub fn configured_flag(flag: bool) -> Option<bool> {
    flag.then_some(true)
}
