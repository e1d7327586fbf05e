mod rest_backend;

pub use rest_backend::RestBackend;
