pub mod dialer;

pub use dialer::Dialer;
