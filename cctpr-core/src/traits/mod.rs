pub use encode::*;
pub use reader::*;
pub use relay::*;
pub use signing::*;

mod encode;
mod reader;
mod relay;
mod signing;
