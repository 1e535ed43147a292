//! The lookup capability the correction pipeline depends on.

use async_trait::async_trait;
use spot_coords_models::CoordinatePair;

use crate::LookupError;

/// Resolves a free-text place query to at most one coordinate.
///
/// Implementations must only return coordinates that passed their
/// bounding-window check. `Ok(None)` means the lookup worked but found
/// nothing usable. The pipeline checks every result again before applying
/// it.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    /// Looks up `query`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] on network, navigation or rate-limit
    /// failures. Callers treat this the same as "no result".
    async fn resolve(&self, query: &str) -> Result<Option<CoordinatePair>, LookupError>;

    /// Looks up `query` for a record with the given free-text address.
    ///
    /// The address is context only; it is never searched for. The default
    /// ignores it.
    ///
    /// # Errors
    ///
    /// Same as [`LocationResolver::resolve`].
    async fn resolve_with_address(
        &self,
        query: &str,
        _address: &str,
    ) -> Result<Option<CoordinatePair>, LookupError> {
        self.resolve(query).await
    }
}

/// Appends `, {qualifier}` to `query` unless the query or the record's
/// `address` already mentions the qualifier (case-insensitive). An empty
/// qualifier leaves the query as is.
#[must_use]
pub fn qualify_query(query: &str, address: &str, qualifier: &str) -> String {
    let query = query.trim();
    let qualifier_lower = qualifier.to_lowercase();
    let mentions = |text: &str| text.to_lowercase().contains(&qualifier_lower);

    if qualifier.is_empty() || mentions(query) || mentions(address) {
        return query.to_string();
    }
    format!("{query}, {qualifier}")
}
