pub mod array_data;
pub mod bitmap;
pub mod column;
pub mod compute;
pub mod datatype;
pub mod executor;
pub mod frame;
pub mod scalar;
pub mod selection;
pub mod testutil;
