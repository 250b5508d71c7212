pub mod accounting;
pub mod logging;
pub mod marriage;
pub mod mortality;
pub mod recruitment;
pub mod reproduction;

pub use accounting::*;
pub use logging::*;
pub use marriage::*;
pub use mortality::*;
pub use recruitment::*;
pub use reproduction::*;
