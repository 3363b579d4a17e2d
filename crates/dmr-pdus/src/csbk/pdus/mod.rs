pub mod csbk;
