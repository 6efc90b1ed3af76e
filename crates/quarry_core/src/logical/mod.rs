pub mod logical_aggregate;
pub mod logical_filter;
pub mod logical_join;
pub mod logical_limit;
pub mod logical_order;
pub mod logical_project;
pub mod logical_scan;
pub mod operator;
pub mod planner;
pub mod table;
pub mod table_ref;
