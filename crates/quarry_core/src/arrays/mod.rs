pub mod batch;
pub mod datatype;
pub mod field;
pub mod hash_key;
pub mod native;
pub mod scalar;
