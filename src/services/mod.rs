pub mod fallback;
pub mod generation;
pub mod providers;
pub mod rate_limit;
pub mod scoring;
pub mod sessions;
