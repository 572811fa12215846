mod cross_backend;
mod same_backend;
