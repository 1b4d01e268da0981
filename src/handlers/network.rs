//! `network`: connection, routing and name-resolution queries.

use super::grammar::{find_preset, operand, preset_names, split_verb, Preset};
use super::{Handler, HandlerContext, HandlerOutcome, ShellDirective};
use crate::error::DirectiveError;
use crate::executor::shell_quote;
use async_trait::async_trait;
use tracing::{debug, warn};

const META_KEY: &str = "network_operation";

const PRESETS: &[Preset] = &[
    ("connections", "netstat -tuln || ss -tuln"),
    ("routes", "ip route show || route -n"),
    ("interfaces", "ip link show || ifconfig"),
    ("active", "netstat -anp || ss -anp"),
    ("dns", "cat /etc/resolv.conf"),
    ("arp", "arp -a || ip neigh"),
    ("sockets", "netstat -l || ss -l"),
    (
        "bandwidth",
        "iftop -t -s 1 2>/dev/null || echo 'iftop command not found'",
    ),
    ("hosts", "cat /etc/hosts"),
    (
        "ports",
        "lsof -i -P -n | grep LISTEN || netstat -tuln | grep LISTEN",
    ),
    (
        "nat",
        "iptables -t nat -L 2>/dev/null || echo 'iptables command not found or requires sudo'",
    ),
    (
        "firewall",
        "iptables -L 2>/dev/null || firewall-cmd --list-all 2>/dev/null || echo 'No firewall info available without sudo'",
    ),
    (
        "listening",
        "lsof -i -P -n | grep LISTEN || netstat -tuln | grep LISTEN || ss -tuln | grep LISTEN",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NetworkRequest<'a> {
    Preset(Preset),
    Ping(&'a str),
    Trace(&'a str),
    Scan(&'a str),
    Lookup(&'a str),
    Whois(&'a str),
}

impl<'a> NetworkRequest<'a> {
    fn parse(content: &'a str) -> Result<Self, DirectiveError> {
        match split_verb(content) {
            ("ping", Some(host)) => Ok(Self::Ping(operand(host, "ping:host")?)),
            ("trace", Some(host)) => Ok(Self::Trace(operand(host, "trace:host")?)),
            ("scan", Some(target)) => Ok(Self::Scan(operand(target, "scan:target")?)),
            ("lookup", Some(host)) => Ok(Self::Lookup(operand(host, "lookup:host")?)),
            ("whois", Some(domain)) => Ok(Self::Whois(operand(domain, "whois:domain")?)),
            (name, None) => find_preset(PRESETS, name)
                .map(Self::Preset)
                .ok_or_else(unknown),
            _ => Err(unknown()),
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            Self::Preset((name, _)) => *name,
            Self::Ping(_) => "ping",
            Self::Trace(_) => "trace",
            Self::Scan(_) => "scan",
            Self::Lookup(_) => "lookup",
            Self::Whois(_) => "whois",
        }
    }

    fn command(&self) -> String {
        match self {
            Self::Preset((_, command)) => command.to_string(),
            Self::Ping(host) => format!("ping -c 4 {}", shell_quote(host)),
            Self::Trace(host) => {
                let host = shell_quote(host);
                format!("traceroute {host} 2>/dev/null || tracepath {host}")
            }
            Self::Scan(target) => format!("nmap -F {} 2>/dev/null", shell_quote(target)),
            Self::Lookup(host) => {
                let host = shell_quote(host);
                format!("host {host} || nslookup {host} || dig {host}")
            }
            Self::Whois(domain) => format!(
                "whois {} 2>/dev/null || echo 'whois command not installed'",
                shell_quote(domain)
            ),
        }
    }
}

fn unknown() -> DirectiveError {
    DirectiveError::MalformedSubcommand(format!(
        "Unknown network command. Valid options: {}, ping:host, trace:host, scan:target, lookup:host, whois:domain",
        preset_names(PRESETS)
    ))
}

#[derive(Debug, Default)]
pub struct NetworkHandler;

impl NetworkHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for NetworkHandler {
    fn protocol(&self) -> &'static str {
        "network"
    }

    async fn handle(
        &self,
        content: &str,
        _ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerOutcome, DirectiveError> {
        let request = NetworkRequest::parse(content).inspect_err(|_| {
            warn!(content, "unknown network command");
        })?;
        debug!(operation = request.operation(), "network request");
        Ok(HandlerOutcome::Delegate(
            ShellDirective::new(request.command()).with_meta(META_KEY, request.operation()),
        ))
    }
}
