pub mod charging;
pub mod energy;
pub mod estimate;
pub mod magnitude;

pub use charging::*;
pub use energy::*;
pub use estimate::*;
pub use magnitude::*;
