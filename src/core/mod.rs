// ─── Pickaxe Core ───
// Artifact acquisition backend.
//
// Architecture:
//   core/
//     downloader/ Hash checks, single fetches, concurrent batches
//     version/    Mojang manifest, version JSON, rule ladders
//     assets/     Asset index + object downloads
//     java/       Adoptium runtime selection and install
//     archive     tar.gz / zip extraction
//     platform    OS/arch identity + filesystem wrappers
//     state/      Settings and on-disk layout

pub mod archive;
pub mod assets;
pub mod downloader;
pub mod error;
pub mod http;
pub mod java;
pub mod platform;
pub mod state;
pub mod version;
