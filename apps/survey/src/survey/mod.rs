// Survey Engine
// Stepwise skills-assessment flow: load tests, capture answers one screen at a
// time, score each test, submit one results batch.
// All platform I/O goes through the collaborator traits in `provider`.

pub mod answers;
pub mod engine;
pub mod error;
pub mod loader;
pub mod notify;
pub mod params;
pub mod provider;
pub mod render;
pub mod scoring;
pub mod session;
pub mod store;
