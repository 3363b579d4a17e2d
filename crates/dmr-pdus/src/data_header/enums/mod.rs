pub mod dpf;
