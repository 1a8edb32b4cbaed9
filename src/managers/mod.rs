pub mod lfg_banner;
pub mod match_notifier;
pub mod thread_cleanup;

pub use lfg_banner::{LfgBanner, LfgReport};
pub use match_notifier::MatchNotifier;
pub use thread_cleanup::{parse_days, CleanupReport, ThreadCleanup};
