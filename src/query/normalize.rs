// Canonical application names for display and grouping. Applied at query time only; the
// store keeps raw process names.

use std::borrow::Cow;

/// Bucket for peer descriptors such as `10.0.0.5:443-10.0.0.9:51234`.
pub const NETWORK_CONNECTIONS: &str = "Network Connections";

/// Ordered priority list. The first entry with any matching prefix wins, so order matters
/// wherever prefixes overlap (a `/home/` path is python even when it names git or node).
const APP_PATTERNS: &[(&str, &[&str])] = &[
    ("brave", &["brave", "/opt/brave"]),
    ("chrome", &["chrome", "chromium", "/opt/google/chrome"]),
    ("firefox", &["firefox", "/usr/lib/firefox"]),
    ("code", &["code", "vscode", "/usr/share/code"]),
    ("claude", &["claude"]),
    ("cursor", &["cursor"]),
    ("telegram", &["telegram"]),
    ("npm", &["npm"]),
    ("python", &["python", "/usr/bin/python", "/home/", "venv/bin/python"]),
    ("node", &["node", "/usr/bin/node"]),
    ("git", &["git", "/usr/bin/git"]),
    ("wget", &["wget", "/usr/bin/wget"]),
    ("curl", &["curl", "/usr/bin/curl"]),
    ("apt", &["apt", "apt-get", "/usr/bin/apt"]),
    ("docker", &["docker", "/usr/bin/docker"]),
    ("gnome-shell", &["/usr/bin/gnome-shell"]),
    ("gnome-software", &["/usr/bin/gnome-software"]),
    ("goa-daemon", &["/usr/libexec/goa-daemon"]),
];

pub fn canonical_name(raw: &str) -> Cow<'_, str> {
    let lower = raw.to_lowercase();
    for (app, patterns) in APP_PATTERNS {
        if patterns.iter().any(|p| lower.starts_with(*p)) {
            return Cow::Borrowed(*app);
        }
    }
    if looks_like_peer(raw) {
        return Cow::Borrowed(NETWORK_CONNECTIONS);
    }
    Cow::Borrowed(raw)
}

/// `host:port` style labels: a colon plus either a hyphen or three or more dot-separated parts.
fn looks_like_peer(raw: &str) -> bool {
    raw.contains(':') && (raw.contains('-') || raw.split('.').count() >= 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_match_is_case_insensitive() {
        assert_eq!(canonical_name("Brave-Browser"), "brave");
        assert_eq!(canonical_name("/opt/google/chrome/chrome"), "chrome");
        assert_eq!(canonical_name("chromium-browser"), "chrome");
        assert_eq!(canonical_name("/usr/bin/python3.12"), "python");
        assert_eq!(canonical_name("Telegram"), "telegram");
    }

    #[test]
    fn earlier_entries_shadow_later_ones() {
        // "/home/" (python) is checked before "git", "node", ...
        assert_eq!(canonical_name("/home/me/bin/git-sync"), "python");
        // Prefixes are not word boundaries.
        assert_eq!(canonical_name("codex"), "code");
        // "apt" comes before its own longer "apt-get" pattern.
        assert_eq!(canonical_name("apt-get"), "apt");
    }

    #[test]
    fn peer_descriptors_become_network_connections() {
        assert_eq!(
            canonical_name("192.168.1.5:443-10.0.0.2:51234"),
            NETWORK_CONNECTIONS
        );
        assert_eq!(canonical_name("10.0.0.2:51234"), NETWORK_CONNECTIONS);
        assert_eq!(canonical_name("host-a:22"), NETWORK_CONNECTIONS);
    }

    #[test]
    fn three_dotted_components_are_enough_for_a_peer() {
        assert_eq!(canonical_name("a.b.c:80"), NETWORK_CONNECTIONS);
        assert_eq!(canonical_name("a.b:80"), "a.b:80");
    }

    #[test]
    fn unmatched_names_pass_through_unchanged() {
        assert_eq!(canonical_name("Spotify"), "Spotify");
        assert_eq!(canonical_name("localhost:631"), "localhost:631");
        assert_eq!(canonical_name("sshd"), "sshd");
        assert_eq!(canonical_name(""), "");
    }
}
