pub mod analysis;
pub mod deletion;
pub mod system;

pub use analysis::*;
pub use deletion::*;
pub use system::*;
