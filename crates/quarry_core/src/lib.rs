pub mod adapter;
pub mod arrays;
pub mod config;
pub mod engine;
pub mod execution;
pub mod explain;
pub mod expr;
pub mod functions;
pub mod infer;
pub mod logical;
pub mod sql;
