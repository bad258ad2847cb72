pub mod pipe;
pub mod run;
