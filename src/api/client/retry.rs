//! Retry budget for the refresh-and-retry protocol.

/// Where a request stands in its one-shot retry budget.
///
/// The value travels alongside the request instead of being stamped onto
/// it, so an `ApiRequest` stays an immutable description.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Attempt {
    Initial,
    Retried,
}

impl Attempt {
    /// Attempt to use after a successful refresh, or `None` once spent.
    pub(super) fn after_refresh(self) -> Option<Self> {
        match self {
            Self::Initial => Some(Self::Retried),
            Self::Retried => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_allows_exactly_one_retry() {
        let next = Attempt::Initial.after_refresh();
        assert_eq!(next, Some(Attempt::Retried));
        assert_eq!(Attempt::Retried.after_refresh(), None);
    }
}
