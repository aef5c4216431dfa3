pub mod authorization;
pub mod error;
pub mod params;
pub mod transaction;
pub mod type_set;

pub use authorization::*;
pub use error::*;
pub use params::*;
pub use transaction::*;
pub use type_set::*;
