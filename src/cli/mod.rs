/// CLI layer: the generated option surface, fixed flags and listing output.
pub mod args;
pub mod output;
pub mod surface;
pub mod whitelist;

pub use output::{write_error, write_options};
pub use surface::{Invocation, Surface};
pub use whitelist::WHITELIST;
