pub mod history;
pub mod session;

pub use history::HistoryStats;
pub use session::SessionRecord;
