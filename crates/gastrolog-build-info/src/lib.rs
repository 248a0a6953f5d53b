//! Build metadata embedded into the GastroLog frontend binary.

/// Static build metadata, embedded at compile time.
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub version: &'static str,
    pub sha: &'static str,
    pub time: &'static str,
}

impl BuildInfo {
    /// A human-readable `version (sha, time)` summary, used on the `Health`
    /// response and the HTTP home page.
    pub fn human_version(&self) -> String {
        format!("{} ({}, built {})", self.version, self.sha, self.time)
    }
}

/// The build metadata for this binary.
///
/// `GASTROLOG_BUILD_SHA` and `GASTROLOG_BUILD_TIME` are expected to be set by
/// the build script of the final binary crate (`gastrolog-frontend`); when
/// unset (e.g. a `cargo build` outside of CI) they fall back to `"unknown"`.
pub const BUILD_INFO: BuildInfo = BuildInfo {
    version: env!("CARGO_PKG_VERSION"),
    sha: match option_env!("GASTROLOG_BUILD_SHA") {
        Some(sha) => sha,
        None => "unknown",
    },
    time: match option_env!("GASTROLOG_BUILD_TIME") {
        Some(time) => time,
        None => "unknown",
    },
};
