mod exercises;
mod sessions;

pub use sessions::MAX_STORED_SESSIONS;
