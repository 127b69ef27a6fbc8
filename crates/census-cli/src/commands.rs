pub mod fold_order;
pub mod merge;
pub mod run;
