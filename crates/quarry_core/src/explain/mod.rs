pub mod explainable;
pub mod node;
