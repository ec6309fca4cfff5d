//! External service integrations.

pub mod salesforce_auth {
    pub use crate::salesforce_auth::*;
}

pub mod salesforce_client {
    pub use crate::salesforce_client::*;
}

pub mod candidate_search {
    pub use crate::candidate_search::*;
}

pub mod enrichment {
    pub use crate::enrichment::*;
}

pub mod funding_config {
    pub use crate::funding_config::*;
}
