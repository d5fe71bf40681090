//! `ipset` + `iptables` backed firewall.

use std::net::Ipv4Addr;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use guard_audit::{ActionKind, ActionRecord, ActionStatus, AuditLedger};

use crate::error::{FirewallError, FirewallResult};
use crate::runner::{ToolOutput, ToolRunner};
use crate::Firewall;

/// Header/metadata prefixes in `ipset list` output that never carry a set
/// member.
const HEADER_PREFIXES: &[&str] = &[
    "Name:",
    "Type:",
    "Revision:",
    "Header:",
    "Size in memory:",
    "References:",
    "Number of entries:",
    "Members:",
];

/// Firewall backend driving `ipset` and `iptables`.
///
/// The external state reconciled here is a named `hash:ip` set with
/// per-entry timeouts plus one `DROP` rule in the configured chain matching
/// the set as source. Both are created on demand by [`Firewall::ensure`]
/// and tolerated if they already exist.
///
/// Tool invocations are synchronous and unbounded; a hung privileged call
/// stalls the calling loop until it returns.
pub struct IpsetFirewall {
    set_name: String,
    chain: String,
    runner: Arc<dyn ToolRunner>,
    ledger: Arc<dyn AuditLedger>,
    /// Serializes concurrent `ensure()` calls so two callers cannot race
    /// the check-then-act rule insertion.
    ensure_lock: Mutex<()>,
}

impl IpsetFirewall {
    /// Creates a controller for the given set and chain names.
    #[must_use]
    pub fn new(
        set_name: impl Into<String>,
        chain: impl Into<String>,
        runner: Arc<dyn ToolRunner>,
        ledger: Arc<dyn AuditLedger>,
    ) -> Self {
        Self {
            set_name: set_name.into(),
            chain: chain.into(),
            runner,
            ledger,
            ensure_lock: Mutex::new(()),
        }
    }

    /// The managed set name.
    #[must_use]
    pub fn set_name(&self) -> &str {
        &self.set_name
    }

    /// The chain holding the filter rule.
    #[must_use]
    pub fn chain(&self) -> &str {
        &self.chain
    }

    fn ipset(&self, args: &[&str]) -> ToolOutput {
        self.runner.run("ipset", args)
    }

    fn iptables(&self, args: &[&str]) -> ToolOutput {
        self.runner.run("iptables", args)
    }

    fn record(&self, record: &ActionRecord) -> FirewallResult<()> {
        self.ledger.append_action(record)?;
        Ok(())
    }

    /// Arguments of the filter rule matching the set with a drop action.
    fn rule_args<'a>(&'a self, op: &'a str) -> Vec<&'a str> {
        vec![
            op,
            &self.chain,
            "-m",
            "set",
            "--match-set",
            &self.set_name,
            "src",
            "-j",
            "DROP",
        ]
    }
}

impl Firewall for IpsetFirewall {
    /// Two-step reconciliation: set first, then rule. A failure in either
    /// step is recorded and stops this call without touching the next step.
    fn ensure(&self) -> FirewallResult<()> {
        let _guard = self.ensure_lock.lock();

        // Step 1: the named set, with per-entry expiry support enabled and
        // no default expiry (expiry is always given per block).
        let probe = self.ipset(&["list", &self.set_name]);
        if !probe.success {
            let create = self.ipset(&["create", &self.set_name, "hash:ip", "timeout", "0"]);
            if !create.success {
                warn!(set = %self.set_name, error = %create.stderr, "failed to create ipset");
                self.record(
                    &ActionRecord::new(ActionKind::EnsureFirewall, ActionStatus::Error)
                        .with_message(create.message()),
                )?;
                return Err(FirewallError::tool("ipset", create.stderr));
            }
            info!(set = %self.set_name, "created ipset");
        }

        // Step 2: the single filter rule, inserted at the head of the chain
        // so it takes precedence over later rules.
        let check = self.iptables(&self.rule_args("-C"));
        if !check.success {
            let insert = self.iptables(&self.rule_args("-I"));
            if !insert.success {
                warn!(chain = %self.chain, error = %insert.stderr, "failed to insert iptables rule");
                self.record(
                    &ActionRecord::new(ActionKind::EnsureFirewall, ActionStatus::Error)
                        .with_message(insert.message()),
                )?;
                return Err(FirewallError::tool("iptables", insert.stderr));
            }
            info!(chain = %self.chain, set = %self.set_name, "inserted iptables rule");
        }

        self.record(
            &ActionRecord::new(ActionKind::EnsureFirewall, ActionStatus::Ok)
                .with_message("ipset and iptables verified"),
        )?;
        Ok(())
    }

    fn block(&self, address: &str, duration_secs: u64, reason: &str) -> FirewallResult<()> {
        let timeout = duration_secs.max(1).to_string();
        // -exist makes re-adding a present address refresh its timeout
        // instead of failing.
        let output = self.ipset(&[
            "-exist",
            "add",
            &self.set_name,
            address,
            "timeout",
            &timeout,
        ]);

        let status = if output.success {
            ActionStatus::Ok
        } else {
            ActionStatus::Error
        };
        self.record(
            &ActionRecord::new(ActionKind::Block, status)
                .with_address(address)
                .with_duration_secs(duration_secs)
                .with_message(output.message()),
        )?;

        if output.success {
            info!(address = %address, duration_secs, reason = %reason, "blocked address");
            Ok(())
        } else {
            warn!(address = %address, error = %output.stderr, "block failed");
            Err(FirewallError::tool("ipset", output.stderr))
        }
    }

    fn unblock(&self, address: &str) -> FirewallResult<()> {
        let output = self.ipset(&["del", &self.set_name, address]);

        let status = if output.success {
            ActionStatus::Ok
        } else {
            ActionStatus::Error
        };
        self.record(
            &ActionRecord::new(ActionKind::Unblock, status)
                .with_address(address)
                .with_message(output.message()),
        )?;

        if output.success {
            info!(address = %address, "unblocked address");
            Ok(())
        } else {
            warn!(address = %address, error = %output.stderr, "unblock failed");
            Err(FirewallError::tool("ipset", output.stderr))
        }
    }

    fn list(&self) -> FirewallResult<Vec<String>> {
        let output = self.ipset(&["list", &self.set_name]);

        let status = if output.success {
            ActionStatus::Ok
        } else {
            ActionStatus::Error
        };
        self.record(
            &ActionRecord::new(ActionKind::List, status).with_message(output.message()),
        )?;

        if output.success {
            Ok(parse_member_lines(&output.stdout))
        } else {
            Err(FirewallError::tool("ipset", output.stderr))
        }
    }
}

/// Extracts set members from `ipset list` output.
///
/// Header lines are discarded by recognized prefix; each remaining line's
/// first token is kept if it parses as an IPv4 literal or contains a colon
/// (IPv6). The result is deduplicated and sorted.
#[must_use]
pub fn parse_member_lines(stdout: &str) -> Vec<String> {
    let mut members: Vec<String> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty() && !HEADER_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
        })
        .filter_map(|line| line.split_whitespace().next())
        .filter(|token| token.parse::<Ipv4Addr>().is_ok() || token.contains(':'))
        .map(ToString::to_string)
        .collect();
    members.sort();
    members.dedup();
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use guard_audit::MemoryLedger;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;

    /// Scripted stand-in for the ipset/iptables host state.
    ///
    /// Tracks the set, its members and the filter rule, and counts mutating
    /// invocations so idempotency can be asserted.
    #[derive(Default)]
    struct FakeHost {
        state: Mutex<HostState>,
    }

    #[derive(Default)]
    struct HostState {
        set_exists: bool,
        rule_exists: bool,
        members: BTreeMap<String, u64>,
        creates: usize,
        inserts: usize,
        fail_create: bool,
        fail_add: bool,
    }

    impl FakeHost {
        fn with_set(self) -> Self {
            self.state.lock().set_exists = true;
            self
        }

        fn failing_create(self) -> Self {
            self.state.lock().fail_create = true;
            self
        }

        fn failing_add(self) -> Self {
            self.state.lock().fail_add = true;
            self
        }

        fn list_output(state: &HostState) -> String {
            let mut out = String::from(
                "Name: blk\nType: hash:ip\nRevision: 6\nHeader: family inet hashsize 1024\n\
                 Size in memory: 216\nReferences: 1\nNumber of entries: 0\nMembers:\n",
            );
            for (member, timeout) in &state.members {
                out.push_str(&format!("{member} timeout {timeout}\n"));
            }
            out
        }
    }

    impl ToolRunner for FakeHost {
        fn run(&self, program: &str, args: &[&str]) -> ToolOutput {
            let mut state = self.state.lock();
            match (program, args.first().copied()) {
                ("ipset", Some("list")) => {
                    if state.set_exists {
                        ToolOutput::ok(Self::list_output(&state))
                    } else {
                        ToolOutput::err("ipset v7.15: The set with the given name does not exist")
                    }
                }
                ("ipset", Some("create")) => {
                    if state.fail_create {
                        ToolOutput::err("ipset v7.15: Operation not permitted")
                    } else {
                        state.set_exists = true;
                        state.creates += 1;
                        ToolOutput::ok("")
                    }
                }
                ("ipset", Some("-exist")) => {
                    if state.fail_add {
                        return ToolOutput::err("ipset v7.15: Operation not permitted");
                    }
                    let address = args[3].to_string();
                    let timeout = args[5].parse().unwrap_or(0);
                    state.members.insert(address, timeout);
                    ToolOutput::ok("")
                }
                ("ipset", Some("del")) => {
                    let address = args[2];
                    if state.members.remove(address).is_some() {
                        ToolOutput::ok("")
                    } else {
                        ToolOutput::err(
                            "ipset v7.15: Element cannot be deleted from the set: it's not added",
                        )
                    }
                }
                ("iptables", Some("-C")) => {
                    if state.rule_exists {
                        ToolOutput::ok("")
                    } else {
                        ToolOutput::err("iptables: Bad rule (does a matching rule exist?)")
                    }
                }
                ("iptables", Some("-I")) => {
                    state.rule_exists = true;
                    state.inserts += 1;
                    ToolOutput::ok("")
                }
                _ => ToolOutput::err(format!("unexpected invocation: {program} {args:?}")),
            }
        }
    }

    fn firewall_with(host: FakeHost) -> (IpsetFirewall, Arc<FakeHost>, Arc<MemoryLedger>) {
        let host = Arc::new(host);
        let ledger = Arc::new(MemoryLedger::new());
        let firewall = IpsetFirewall::new(
            "blk",
            "INPUT",
            Arc::clone(&host) as Arc<dyn ToolRunner>,
            Arc::clone(&ledger) as Arc<dyn AuditLedger>,
        );
        (firewall, host, ledger)
    }

    #[test]
    fn ensure_creates_set_and_rule_once() {
        let (firewall, host, ledger) = firewall_with(FakeHost::default());

        firewall.ensure().expect("first ensure");
        firewall.ensure().expect("second ensure");

        let state = host.state.lock();
        assert_eq!(state.creates, 1);
        assert_eq!(state.inserts, 1);
        drop(state);

        let actions = ledger.actions();
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| a.action == ActionKind::EnsureFirewall));
        assert!(actions.iter().all(|a| a.status == ActionStatus::Ok));
    }

    #[test]
    fn ensure_tolerates_existing_set() {
        let (firewall, host, _ledger) = firewall_with(FakeHost::default().with_set());
        firewall.ensure().expect("ensure");
        assert_eq!(host.state.lock().creates, 0);
        assert_eq!(host.state.lock().inserts, 1);
    }

    #[test]
    fn ensure_stops_after_create_failure() {
        let (firewall, host, ledger) = firewall_with(FakeHost::default().failing_create());

        assert!(firewall.ensure().is_err());

        // Rule step never ran.
        assert_eq!(host.state.lock().inserts, 0);
        let actions = ledger.actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].status, ActionStatus::Error);
        assert!(actions[0]
            .message
            .as_deref()
            .is_some_and(|m| m.contains("not permitted")));
    }

    #[test]
    fn block_adds_member_with_timeout() {
        let (firewall, host, ledger) = firewall_with(FakeHost::default().with_set());

        firewall
            .block("203.0.113.7", 86_400, "burst detected (5 attempts)")
            .expect("block");

        assert_eq!(host.state.lock().members.get("203.0.113.7"), Some(&86_400));
        let actions = ledger.actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, ActionKind::Block);
        assert_eq!(actions[0].src_ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(actions[0].duration_secs, Some(86_400));
        assert_eq!(actions[0].status, ActionStatus::Ok);
    }

    #[test]
    fn reblock_refreshes_timeout() {
        let (firewall, host, _ledger) = firewall_with(FakeHost::default().with_set());

        firewall.block("203.0.113.7", 60, "r").expect("block");
        firewall.block("203.0.113.7", 600, "r").expect("reblock");

        assert_eq!(host.state.lock().members.get("203.0.113.7"), Some(&600));
    }

    #[test]
    fn zero_duration_clamped_to_one() {
        let (firewall, host, _ledger) = firewall_with(FakeHost::default().with_set());
        firewall.block("203.0.113.7", 0, "r").expect("block");
        assert_eq!(host.state.lock().members.get("203.0.113.7"), Some(&1));
    }

    #[test]
    fn block_failure_recorded_not_fatal() {
        let (firewall, _host, ledger) = firewall_with(FakeHost::default().with_set().failing_add());

        assert!(firewall.block("203.0.113.7", 60, "r").is_err());

        let actions = ledger.actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].status, ActionStatus::Error);
    }

    #[test]
    fn block_unblock_round_trip() {
        let (firewall, _host, _ledger) = firewall_with(FakeHost::default().with_set());

        firewall.block("203.0.113.7", 120, "r").expect("block");
        assert!(firewall.list().expect("list").contains(&"203.0.113.7".to_string()));

        firewall.unblock("203.0.113.7").expect("unblock");
        assert!(!firewall.list().expect("list").contains(&"203.0.113.7".to_string()));
    }

    #[test]
    fn unblock_absent_address_is_recorded_error() {
        let (firewall, _host, ledger) = firewall_with(FakeHost::default().with_set());

        assert!(firewall.unblock("198.51.100.1").is_err());

        let actions = ledger.actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, ActionKind::Unblock);
        assert_eq!(actions[0].status, ActionStatus::Error);
    }

    #[test]
    fn list_returns_sorted_members() {
        let (firewall, _host, _ledger) = firewall_with(FakeHost::default().with_set());

        firewall.block("203.0.113.9", 60, "r").expect("block");
        firewall.block("198.51.100.4", 60, "r").expect("block");

        let members = firewall.list().expect("list");
        assert_eq!(members, vec!["198.51.100.4".to_string(), "203.0.113.9".to_string()]);
    }

    #[test]
    fn parse_member_lines_drops_headers() {
        let stdout = "Name: blk\nType: hash:ip\nMembers:\n203.0.113.7 timeout 120\n";
        assert_eq!(parse_member_lines(stdout), vec!["203.0.113.7".to_string()]);
    }

    #[test]
    fn parse_member_lines_full_header() {
        let stdout = "Name: blk\nType: hash:ip\nRevision: 6\nHeader: family inet hashsize 1024 maxelem 65536 timeout 0\nSize in memory: 216\nReferences: 1\nNumber of entries: 2\nMembers:\n203.0.113.7 timeout 120\n2001:db8::9 timeout 60\n";
        assert_eq!(
            parse_member_lines(stdout),
            vec!["2001:db8::9".to_string(), "203.0.113.7".to_string()]
        );
    }

    #[test]
    fn parse_member_lines_dedups() {
        let stdout = "Members:\n203.0.113.7 timeout 120\n203.0.113.7\n";
        assert_eq!(parse_member_lines(stdout), vec!["203.0.113.7".to_string()]);
    }

    #[test]
    fn parse_member_lines_skips_junk_tokens() {
        let stdout = "Members:\nnot-an-address timeout 5\n203.0.113.7 timeout 120\n";
        assert_eq!(parse_member_lines(stdout), vec!["203.0.113.7".to_string()]);
    }

    #[test]
    fn parse_member_lines_empty_output() {
        assert!(parse_member_lines("").is_empty());
        assert!(parse_member_lines("Members:\n").is_empty());
    }
}
