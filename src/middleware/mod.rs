pub mod advanced_results;
pub mod auth;
pub mod response;

pub use advanced_results::AdvancedResults;
pub use response::{ApiResponse, ApiResult};
