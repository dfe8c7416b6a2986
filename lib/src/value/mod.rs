mod value;
mod mapper;

pub use value::*;
pub use mapper::*;
