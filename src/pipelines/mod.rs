pub mod align;
pub mod preprocess;
pub mod quantify;
pub mod rna_seq;
