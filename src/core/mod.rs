// Domain-layer modules and shared errors/models
pub mod models {
    pub use crate::models::*;
}

pub mod predictor {
    pub use crate::predictor::*;
}

pub mod pipeline {
    pub use crate::pipeline::*;
}

pub mod errors {
    pub use crate::errors::*;
}
