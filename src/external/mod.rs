pub mod rewards;
pub mod settlement;

pub use rewards::*;
pub use settlement::*;
