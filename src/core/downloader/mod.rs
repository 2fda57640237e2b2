pub mod artifact;
pub mod batch;
pub mod client;
pub mod integrity;

pub use artifact::Downloadable;
pub use batch::{dedup_tasks, DedupKey, DownloadTask};
pub use client::Downloader;
pub use integrity::{select_algorithm, validate, HashAlgorithm};
