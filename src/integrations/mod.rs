//! External service integrations.

pub mod hub_client {
    pub use crate::hub_client::*;
}

pub mod model_loader {
    pub use crate::model_loader::*;
}

pub mod publisher {
    pub use crate::publisher::*;
}
