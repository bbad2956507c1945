pub mod finder;
pub mod protocol;
pub mod worker;
