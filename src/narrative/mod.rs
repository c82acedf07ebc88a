mod impact;
mod renderer;
mod template;

pub use impact::*;
pub use renderer::*;
pub use template::*;
