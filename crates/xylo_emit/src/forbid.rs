use xylo_access::Node;

// -----------------------------------------------------------------------------
// Forbidder

/// The inclusion filter, consulted before descending into any child.
///
/// A rejected child is simply skipped: the engine proceeds as if the
/// accessor had yielded nothing. Rejection is never an error.
///
/// The trait is implemented for plain closures:
///
/// ```
/// use xylo_emit::Forbidder;
/// use xylo_access::Node;
///
/// let no_secrets = |tag: &str, _child: &dyn Node| tag != "secret";
/// assert!(no_secrets.permit("name", &0_u32));
/// assert!(!no_secrets.permit("secret", &0_u32));
/// ```
pub trait Forbidder: Send + Sync {
    /// Returns `false` to veto serialization of `child` under `tag`.
    fn permit(&self, tag: &str, child: &dyn Node) -> bool;
}

impl<F> Forbidder for F
where
    F: Fn(&str, &dyn Node) -> bool + Send + Sync,
{
    fn permit(&self, tag: &str, child: &dyn Node) -> bool {
        self(tag, child)
    }
}
