pub mod runtime;

pub use runtime::{find_jdk, java_binary, sort_releases, AdoptiumRelease, JdkInstaller};
