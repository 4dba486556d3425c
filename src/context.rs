//! Explicit per-request context.
//!
//! Carried as an argument through every call boundary instead of ambient
//! task-local state, so audit correlation survives any executor topology.

use uuid::Uuid;

const MAX_IP_LEN: usize = 45;
const MAX_USER_AGENT_LEN: usize = 255;

/// Correlation id and client metadata for one inbound request.
///
/// The transport layer builds one of these at the edge; `ip` and
/// `user_agent` are best-effort diagnostics, never trusted for
/// authorization.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Correlation id, echoed into every audit event
    pub request_id: Uuid,
    /// Client address as reported by the transport, bounded length
    pub ip: Option<String>,
    /// Client user agent, sanitized and bounded
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Context with a fresh correlation id and no client metadata.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            ip: None,
            user_agent: None,
        }
    }

    /// Attach the client address, truncated to the longest valid textual
    /// IP form (45 bytes covers IPv6-mapped IPv4).
    #[must_use]
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(truncate(ip.into(), MAX_IP_LEN));
        self
    }

    /// Attach the client user agent, stripped to printable characters and
    /// truncated.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(sanitize_user_agent(&user_agent.into()));
        self
    }

    /// Reuse an upstream correlation id instead of generating one.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop control characters, then bound the length. Header values arrive
/// attacker-controlled; they end up in audit logs verbatim otherwise.
fn sanitize_user_agent(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !c.is_control()).collect();
    if cleaned.is_empty() {
        return "unknown".to_string();
    }
    truncate(cleaned, MAX_USER_AGENT_LEN)
}

fn truncate(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_ids_are_unique() {
        assert_ne!(RequestContext::new().request_id, RequestContext::new().request_id);
    }

    #[test]
    fn test_user_agent_strips_control_chars() {
        let ctx = RequestContext::new().with_user_agent("Mozilla/5.0\r\nX-Evil: 1");
        assert_eq!(ctx.user_agent.as_deref(), Some("Mozilla/5.0X-Evil: 1"));
    }

    #[test]
    fn test_user_agent_truncated() {
        let ctx = RequestContext::new().with_user_agent("a".repeat(400));
        assert_eq!(ctx.user_agent.as_deref().map(str::len), Some(255));
    }

    #[test]
    fn test_empty_user_agent_becomes_unknown() {
        let ctx = RequestContext::new().with_user_agent("\u{0007}");
        assert_eq!(ctx.user_agent.as_deref(), Some("unknown"));
    }

    #[test]
    fn test_ip_truncated() {
        let ctx = RequestContext::new().with_ip("1".repeat(60));
        assert_eq!(ctx.ip.as_deref().map(str::len), Some(45));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s = format!("{}é", "a".repeat(44));
        let cut = truncate(s, 45);
        assert_eq!(cut.len(), 44);
    }

    #[test]
    fn test_upstream_request_id_preserved() {
        let upstream = Uuid::new_v4();
        let ctx = RequestContext::new().with_request_id(upstream);
        assert_eq!(ctx.request_id, upstream);
    }
}
