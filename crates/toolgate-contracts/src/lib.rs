//! # toolgate-contracts
//!
//! Shared types, verdicts, and error contracts for the toolgate
//! authorization core.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: only data definitions and error types.

pub mod audit;
pub mod capability;
pub mod confirm;
pub mod error;
pub mod principal;
pub mod tool;
pub mod verdict;
pub mod verify;

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use super::*;
    use audit::{AuditEntry, AuditFilter, DecisionRecord};
    use capability::{Capability, CapabilityGrant, CapabilitySet, GrantScope};
    use error::GateError;
    use principal::{PrincipalId, Route};
    use tool::{Reversibility, ToolDeclaration};
    use verdict::{DenyKind, Outcome, Verdict};

    // ── Capability taxonomy ──────────────────────────────────────────────────

    #[test]
    fn capability_names_parse_back() {
        for cap in Capability::ALL {
            assert_eq!(cap.as_str().parse::<Capability>().unwrap(), cap);
        }
        assert!("launch-missiles".parse::<Capability>().is_err());
    }

    #[test]
    fn capability_serializes_kebab_case() {
        let json = serde_json::to_string(&Capability::SendCommunication).unwrap();
        assert_eq!(json, "\"send-communication\"");
    }

    #[test]
    fn capability_set_reports_missing() {
        let required: CapabilitySet =
            [Capability::SendCommunication, Capability::NetworkEgress].into_iter().collect();
        let held: CapabilitySet = [Capability::NetworkEgress].into_iter().collect();

        let missing = required.missing_from(&held);
        assert_eq!(missing.len(), 1);
        assert!(missing.has(&Capability::SendCommunication));
        assert_eq!(missing.to_string(), "{send-communication}");
    }

    // ── Grant scope and expiry ───────────────────────────────────────────────

    #[test]
    fn scope_matches_exact_prefix_and_wildcard() {
        let scope = GrantScope::new(["primary", "user-*"]);
        assert!(scope.permits(Some("primary")));
        assert!(scope.permits(Some("user-work")));
        assert!(!scope.permits(Some("shared-team")));
        // No target resolvable: a scoped grant never covers the call.
        assert!(!scope.permits(None));

        assert!(GrantScope::new(["*"]).permits(Some("anything")));
    }

    #[test]
    fn scope_prefix_does_not_cover_parent_segments() {
        let scope = GrantScope::new(["/home/user/notes/*", "/srv/report.txt"]);
        assert!(scope.permits(Some("/home/user/notes/todo.txt")));
        assert!(scope.permits(Some("/home/user/notes/..hidden")));
        assert!(!scope.permits(Some("/home/user/notes/../../../etc/shadow")));
        assert!(!scope.permits(Some("/home/user/notes/sub\\..\\..\\secret")));
        assert!(!scope.permits(Some("/srv/../srv/report.txt")));

        // An unrestricted pattern still matches.
        assert!(GrantScope::new(["*"]).permits(Some("/home/user/notes/../x")));
    }

    #[test]
    fn grant_expiry_is_inclusive() {
        let now = Utc::now();
        let mut grant = CapabilityGrant::new(
            PrincipalId::new("session-1"),
            [Capability::ReadLocalData].into_iter().collect(),
            None,
            Some(now),
        );
        assert!(grant.is_expired(now));
        assert!(!grant.is_expired(now - Duration::seconds(1)));

        grant.expires_at = None;
        assert!(!grant.is_expired(now + Duration::days(365)));
    }

    // ── Tool declaration ─────────────────────────────────────────────────────

    fn calendar_decl() -> ToolDeclaration {
        ToolDeclaration {
            name: "calendar.create_event".to_string(),
            description: "Create a calendar event".to_string(),
            schema: serde_json::Value::Null,
            capabilities: [Capability::ModifyCalendar].into_iter().collect(),
            reversibility: Reversibility::Reversible,
            expected_routes: vec!["calendar".to_string()],
            target_field: Some("event.calendar_id".to_string()),
        }
    }

    #[test]
    fn declaration_resolves_nested_target() {
        let decl = calendar_decl();
        let args = json!({ "event": { "calendar_id": "primary", "title": "standup" } });
        assert_eq!(decl.target(&args).as_deref(), Some("primary"));
        assert_eq!(decl.target(&json!({ "event": {} })), None);
    }

    #[test]
    fn declaration_route_wildcard() {
        let mut decl = calendar_decl();
        assert!(decl.expects_route("calendar"));
        assert!(!decl.expects_route("email"));
        decl.expected_routes = vec!["*".to_string()];
        assert!(decl.expects_route("email"));
    }

    // ── Verdict ──────────────────────────────────────────────────────────────

    #[test]
    fn verdict_deny_round_trips() {
        let original = Verdict::deny(DenyKind::RouteMismatch, "wrong route");
        let json = serde_json::to_string(&original).unwrap();
        assert!(json.contains("\"outcome\":\"deny\""));
        let decoded: Verdict = serde_json::from_str(&json).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn needs_confirmation_reports_confirmation_required() {
        let verdict = Verdict::NeedsConfirmation {
            pending: confirm::PendingConfirmation {
                tool_name: "email.send".to_string(),
                args_hash: "ab".repeat(32),
            },
            reason: "irreversible".to_string(),
        };
        assert_eq!(verdict.kind(), Some(DenyKind::ConfirmationRequired));
        assert_eq!(verdict.outcome(), Outcome::NeedsConfirmation);
        assert!(!verdict.is_allow());
        assert!(!DenyKind::ConfirmationRequired.is_terminal());
        assert!(DenyKind::ConfirmationInvalid.is_terminal());
    }

    // ── Audit filter ─────────────────────────────────────────────────────────

    fn entry(sequence: u64, tool: &str, verdict: Verdict) -> AuditEntry {
        AuditEntry {
            sequence,
            record: DecisionRecord {
                principal: PrincipalId::new("session-1"),
                route: Route::new("email"),
                tool_name: tool.to_string(),
                arguments: json!({}),
                verdict,
                route_check: None,
                confirmation_token: None,
                timestamp: Utc::now(),
            },
            prev_hash: AuditEntry::GENESIS_HASH.to_string(),
            this_hash: String::new(),
        }
    }

    #[test]
    fn audit_filter_combines_fields() {
        let allow = entry(3, "email.send", Verdict::Allow);
        let deny = entry(4, "email.send", Verdict::deny(DenyKind::DenylistMatch, "no"));

        let filter = AuditFilter::default().tool("email.send").outcome(Outcome::Deny);
        assert!(!filter.matches(&allow));
        assert!(filter.matches(&deny));

        let after = AuditFilter::default().after(3);
        assert!(!after.matches(&allow));
        assert!(after.matches(&deny));

        assert!(AuditFilter::default().matches(&allow));
        assert!(!AuditFilter::default().tool("time.now").matches(&allow));
    }

    // ── GateError ────────────────────────────────────────────────────────────

    #[test]
    fn every_pipeline_error_maps_to_a_deny_kind() {
        let cases = [
            (GateError::UnknownTool { tool: "x".into() }, DenyKind::UnknownTool),
            (
                GateError::SchemaViolation { tool: "x".into(), reason: "r".into() },
                DenyKind::SchemaViolation,
            ),
            (
                GateError::DenylistMatch { tool: "x".into(), reason: "r".into() },
                DenyKind::DenylistMatch,
            ),
            (
                GateError::RouteMismatch { tool: "x".into(), route: "r".into() },
                DenyKind::RouteMismatch,
            ),
            (
                GateError::InsufficientCapability {
                    principal: "p".into(),
                    tool: "x".into(),
                    missing: "{}".into(),
                },
                DenyKind::InsufficientCapability,
            ),
            (
                GateError::ConfirmationRequired { tool: "x".into(), reason: "r".into() },
                DenyKind::ConfirmationRequired,
            ),
            (
                GateError::ConfirmationInvalid { reason: "r".into() },
                DenyKind::ConfirmationInvalid,
            ),
            (
                GateError::AuditUnavailable { reason: "r".into() },
                DenyKind::AuditUnavailable,
            ),
        ];
        for (err, kind) in cases {
            assert_eq!(err.deny_kind(), Some(kind), "{err}");
        }

        assert_eq!(GateError::DuplicateDeclaration { tool: "x".into() }.deny_kind(), None);
        assert_eq!(GateError::ConfigError { reason: "r".into() }.deny_kind(), None);
    }

    #[test]
    fn insufficient_capability_display_names_missing() {
        let err = GateError::InsufficientCapability {
            principal: "session-9".to_string(),
            tool: "email.send".to_string(),
            missing: "{send-communication}".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("session-9"));
        assert!(msg.contains("send-communication"));
        assert!(msg.contains("email.send"));
    }

    #[test]
    fn audit_unavailable_display() {
        let err = GateError::AuditUnavailable {
            reason: "disk full".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("audit log unavailable"));
        assert!(msg.contains("disk full"));
    }
}
