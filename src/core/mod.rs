// Domain-layer modules and shared errors/models
pub mod advance {
    pub use crate::advance::*;
}

pub mod ledger {
    pub use crate::ledger::*;
}

pub mod matching {
    pub use crate::matching::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod normalize {
    pub use crate::normalize::*;
}

pub mod revenue {
    pub use crate::revenue::*;
}

pub mod errors {
    pub use crate::errors::*;
}
