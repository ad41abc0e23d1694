pub mod username_index;
