//! Names of the views served by the projector.

use serde::Serialize;

/// A read view served by the [`QueryProjector`](crate::QueryProjector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    CatalogByOwner,
    DiscoveryFeed,
    MyLoans,
    RequestedInstruments,
    LoanList,
}

impl View {
    pub const ALL: [View; 5] = [
        View::CatalogByOwner,
        View::DiscoveryFeed,
        View::MyLoans,
        View::RequestedInstruments,
        View::LoanList,
    ];

    /// Returns the name used in logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            View::CatalogByOwner => "catalog_by_owner",
            View::DiscoveryFeed => "discovery_feed",
            View::MyLoans => "my_loans",
            View::RequestedInstruments => "requested_instruments",
            View::LoanList => "loan_list",
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_serialization() {
        for view in View::ALL {
            let json = serde_json::to_value(view).unwrap();
            assert_eq!(json, view.name());
        }
    }
}
