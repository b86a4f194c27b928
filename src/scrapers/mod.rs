pub mod bidfta;
pub mod browser;
pub mod extract;
pub mod images;
pub mod query;
pub mod row;
pub mod traits;
pub mod types;
pub mod window;

pub use bidfta::SearchOrchestrator;
pub use browser::ChromeSession;
pub use images::HttpImageDownloader;
pub use traits::{ImageDownloader, SkipImages};
pub use window::compute_window;
