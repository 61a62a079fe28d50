pub mod analyze;
pub mod query;
pub mod results;

pub use analyze::AnalyzeArgs;
pub use query::QueryArgs;
pub use results::ResultsArgs;
