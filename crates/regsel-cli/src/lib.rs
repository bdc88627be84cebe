pub mod pipeline;
pub mod util;
