pub mod budget;
pub mod call;
pub mod lead;
