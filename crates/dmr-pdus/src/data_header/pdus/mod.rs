pub mod data_header;
