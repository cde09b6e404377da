pub mod shine;
