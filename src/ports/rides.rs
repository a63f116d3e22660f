use crate::types::feed::Ride;

/// Resolves an order's ride reference in the upstream document store.
/// `Ok(None)` means the ride does not exist.
pub trait RideLookup: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a>: Future<Output = Result<Option<Ride>, Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn ride<'a>(&'a self, ride_id: &'a str) -> Self::Fut<'a>;
}
