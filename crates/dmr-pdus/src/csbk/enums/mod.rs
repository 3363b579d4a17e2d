pub mod csbko;
