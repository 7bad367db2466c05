pub mod clock;
pub mod code_generator;
pub mod jwt;
pub mod validation;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use code_generator::generate_redemption_code;
pub use jwt::*;
pub use validation::*;
