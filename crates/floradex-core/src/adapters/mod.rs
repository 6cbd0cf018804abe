//! Provider adapters: request construction and boundary validation per
//! upstream API.

mod permapeople;
mod trefle;

pub use permapeople::PermapeopleAdapter;
pub use trefle::TrefleAdapter;
