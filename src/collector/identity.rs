// Best-effort recovery of real process names for generic nethogs tokens.

use std::path::PathBuf;

/// Token prefix nethogs reports for interpreters and re-exec'd binaries.
const GENERIC_PATH_PREFIX: &str = "/proc/";
/// Literal nethogs uses when it cannot attribute a connection.
const UNRELIABLE_MARKER: &str = "unknown";

/// Looks up a process name by pid. Implementations swallow OS errors and return `None`.
pub trait IdentityResolver: Send + Sync {
    fn lookup(&self, pid: u32) -> Option<String>;
}

/// True when `token` is not a usable process identity on its own.
pub fn needs_resolution(token: &str) -> bool {
    token.is_empty() || token.starts_with(GENERIC_PATH_PREFIX) || token == UNRELIABLE_MARKER
}

/// Returns `token` unless it is generic and `resolver` knows better.
pub fn resolve_process_name(resolver: &dyn IdentityResolver, pid: u32, token: String) -> String {
    if !needs_resolution(&token) {
        return token;
    }
    resolver.lookup(pid).unwrap_or(token)
}

/// Reads `<root>/<pid>/comm`, falling back to the basename of `argv[0]` from `cmdline`.
#[derive(Debug, Clone)]
pub struct ProcfsResolver {
    root: PathBuf,
}

impl Default for ProcfsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcfsResolver {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read_comm(&self, pid: u32) -> Option<String> {
        let comm = std::fs::read_to_string(self.root.join(pid.to_string()).join("comm")).ok()?;
        let comm = comm.trim();
        (!comm.is_empty()).then(|| comm.to_string())
    }

    fn read_cmdline_exe(&self, pid: u32) -> Option<String> {
        let raw = std::fs::read(self.root.join(pid.to_string()).join("cmdline")).ok()?;
        let cmdline = String::from_utf8_lossy(&raw);
        let argv0 = cmdline.split('\0').next().filter(|s| !s.is_empty())?;
        let exe = argv0.rsplit('/').next().unwrap_or(argv0);
        (!exe.is_empty()).then(|| exe.to_string())
    }
}

impl IdentityResolver for ProcfsResolver {
    // Blocking reads, called from the collector task: two tiny procfs files at most.
    fn lookup(&self, pid: u32) -> Option<String> {
        self.read_comm(pid).or_else(|| self.read_cmdline_exe(pid))
    }
}

/// Keeps whatever nethogs reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl IdentityResolver for NoopResolver {
    fn lookup(&self, _pid: u32) -> Option<String> {
        None
    }
}
