pub mod pantry_service;
pub mod reaper;
