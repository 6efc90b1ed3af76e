pub mod plan_join;
