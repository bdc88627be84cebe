pub mod csv_table;

pub use csv_table::{infer_delimiter, read_labeled_table, read_table, train_test_split, write_table, Table};
