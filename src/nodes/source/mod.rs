mod array;
mod constant;
mod karplus_strong;
mod piecewise;
mod random;
mod sine;
mod wav_reader;

pub use array::*;
pub use constant::*;
pub use karplus_strong::*;
pub use piecewise::*;
pub use random::*;
pub use sine::*;
pub use wav_reader::*;
