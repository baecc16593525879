pub mod knowledge;
pub mod mcq;
