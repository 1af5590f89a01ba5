// Thin namespace wrapper for API-layer components
pub mod handlers {
    pub use crate::handlers::*;
}

pub mod docs {
    pub use crate::api_doc::*;
}

pub mod views {
    pub use crate::views::*;
}
