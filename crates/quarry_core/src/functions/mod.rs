pub mod aggregate;
pub mod implicit;
