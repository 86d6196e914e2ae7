pub mod psg;
pub mod vdp;

pub use psg::Psg;
pub use vdp::{TvSystem, Vdp};
