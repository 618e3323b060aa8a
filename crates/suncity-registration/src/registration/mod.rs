pub mod export;
pub mod visitor;
