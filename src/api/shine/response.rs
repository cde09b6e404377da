use serde::Deserialize;

/// Generic Shine API response envelope.
///
/// The cloud wraps every JSON payload in a `data` field. Status codes are
/// conveyed over HTTP, so a missing envelope is the only in-band failure
/// the caller has to deal with.
#[derive(Deserialize)]
pub struct Response<D> {
    pub data: Option<D>,
}
