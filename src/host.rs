// Host helpers: default-route interface detection from /proc/net/route.

/// Name of the interface carrying the IPv4 default route, if any.
pub fn default_route_interface() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/net/route").ok()?;
        parse_default_route(&content)
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// First interface whose destination is 0.0.0.0 in `/proc/net/route` format (header line first).
pub fn parse_default_route(content: &str) -> Option<String> {
    content.lines().skip(1).find_map(|line| {
        let mut fields = line.split_whitespace();
        let iface = fields.next()?;
        let destination = fields.next()?;
        (destination == "00000000").then(|| iface.to_string())
    })
}
