pub mod voters;
