pub mod apply;
pub mod expand;
