pub mod display_backend;
