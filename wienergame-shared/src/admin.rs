use crate::domain::Username;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminDecision {
    /// No admin exists yet; the first caller may appoint one.
    Bootstrap,
    /// The current admin hands over (or re-appoints themselves).
    Succession,
    Denied,
}

impl AdminDecision {
    pub fn is_allowed(self) -> bool {
        !matches!(self, AdminDecision::Denied)
    }
}

/// Decides whether `requester` may change the admin.
pub fn may_change_admin(current: Option<&str>, requester: Option<&str>) -> AdminDecision {
    match (current, requester) {
        (None, _) => AdminDecision::Bootstrap,
        (Some(cur), Some(req)) if cur == req => AdminDecision::Succession,
        _ => AdminDecision::Denied,
    }
}

/// Admin-only operations require an admin to exist and the requester to be it.
pub fn is_admin(current: Option<&str>, requester: Option<&str>) -> bool {
    matches!((current, requester), (Some(cur), Some(req)) if cur == req)
}

/// Parses the `/new_admin` argument: first token, leading `@` stripped.
pub fn parse_new_admin_arg(args: &str) -> Option<Username> {
    let token = args.split_whitespace().next()?;
    Username::parse(token).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anyone_may_bootstrap() {
        assert_eq!(may_change_admin(None, Some("eve")), AdminDecision::Bootstrap);
        assert_eq!(may_change_admin(None, None), AdminDecision::Bootstrap);
    }

    #[test]
    fn current_admin_may_hand_over() {
        assert_eq!(
            may_change_admin(Some("dave"), Some("dave")),
            AdminDecision::Succession
        );
    }

    #[test]
    fn others_are_denied_once_admin_exists() {
        assert_eq!(may_change_admin(Some("dave"), Some("carol")), AdminDecision::Denied);
        assert_eq!(may_change_admin(Some("dave"), None), AdminDecision::Denied);
        assert!(!may_change_admin(Some("dave"), Some("Dave")).is_allowed());
    }

    #[test]
    fn admin_only_needs_existing_admin() {
        assert!(is_admin(Some("dave"), Some("dave")));
        assert!(!is_admin(None, Some("dave")));
        assert!(!is_admin(None, None));
        assert!(!is_admin(Some("dave"), Some("carol")));
    }

    #[test]
    fn new_admin_argument_parsing() {
        assert_eq!(parse_new_admin_arg("@carol").unwrap().as_str(), "carol");
        assert_eq!(parse_new_admin_arg("  carol extra").unwrap().as_str(), "carol");
        assert!(parse_new_admin_arg("").is_none());
        assert!(parse_new_admin_arg("   ").is_none());
        assert!(parse_new_admin_arg("@").is_none());
    }
}
