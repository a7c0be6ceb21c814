pub mod light_curve;
pub mod planet;
pub mod report;
pub mod threshold;

pub use light_curve::*;
pub use planet::*;
pub use report::*;
pub use threshold::*;
