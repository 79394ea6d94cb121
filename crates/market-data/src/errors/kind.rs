/// Classification of a failed upstream fetch.
///
/// Callers that only need to decide whether to fall back never have to look at
/// this; it exists for logging and for the HTTP layer's status mapping.
///
/// | Kind | Origin |
/// |------|--------|
/// | `Transport` | network failure, timeout, non-2xx status, dead limiter |
/// | `ProviderRejection` | provider says invalid symbol, no data, or slow down |
/// | `Mapping` | payload did not have the shape we expected |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureKind {
    /// The request never produced a usable HTTP response.
    Transport,

    /// The provider answered, but explicitly refused to give us a quote.
    ProviderRejection,

    /// The provider answered with something we could not map.
    Mapping,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::ProviderRejection => write!(f, "provider_rejection"),
            Self::Mapping => write!(f, "mapping"),
        }
    }
}
