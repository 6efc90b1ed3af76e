pub mod compile;
pub mod query;
pub mod query_result;
pub mod session;
