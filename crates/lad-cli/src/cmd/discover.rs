//! `lad discover`: find agents and print them, optionally asking for consent.

use crate::cli::DiscoverArgs;
use crate::{init_tracing, ui, with_bootstrap_logging};
use async_trait::async_trait;
use lad_client::{ConsentCallback, DiscoverOptions, LadClient};
use lad_types::agent::{DiscoveredAgent, DiscoveryResult};
use lad_types::config::{load_client_config, ClientConfig};
use lad_types::consent::{ConsentDisplay, ConsentRequest, ConsentResponse};
use lad_types::error::{LadError, LadResult};
use std::io::{BufRead, Write};
use std::path::PathBuf;

pub fn cmd_discover(config_path: Option<PathBuf>, args: DiscoverArgs) -> i32 {
    let mut config = with_bootstrap_logging(|| load_client_config(config_path.as_deref()));
    apply_overrides(&args, &mut config);
    init_tracing(&config.log_level);

    let client = match LadClient::new(config) {
        Ok(c) => c,
        Err(e) => {
            ui::error(&format!("Failed to create LAD client: {e}"));
            return 1;
        }
    };
    let options = DiscoverOptions::from_config(client.config());
    let Some(rt) = super::runtime() else {
        return 1;
    };

    let result = rt.block_on(async {
        if args.with_consent {
            client
                .discover_with_consent(Some(&TerminalConsent), &options)
                .await
        } else {
            client.discover(&options).await
        }
    });

    if args.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                ui::error(&format!("Failed to serialize result: {e}"));
                return 1;
            }
        }
    } else {
        print_result(&result);
    }
    0
}

/// Overlay command-line flags on the loaded configuration.
pub(crate) fn apply_overrides(args: &DiscoverArgs, config: &mut ClientConfig) {
    if args.url.is_some() {
        config.fallback_url = args.url.clone();
    }
    if args.no_mdns {
        config.try_mdns = false;
    }
    if let Some(timeout) = args.timeout {
        config.mdns_timeout_secs = timeout;
    }
    if args.no_verify_tls {
        config.verify_tls = false;
    }
    if args.ca_bundle.is_some() {
        config.ca_bundle = args.ca_bundle.clone();
    }
    if args.require_verified {
        config.require_verified = true;
    }
    if args.signing_public_key.is_some() {
        config.signing_public_key = args.signing_public_key.clone();
    }
}

fn print_result(result: &DiscoveryResult) {
    ui::section(&format!(
        "Discovered {} agent(s) via {}",
        result.agents.len(),
        result.discovery_method
    ));
    if let Some(ssid) = &result.network_ssid {
        ui::kv("Network", ssid);
    }
    if let Some(realm) = &result.network_realm {
        ui::kv("Realm", realm);
    }
    ui::blank();

    for agent in &result.agents {
        print_agent(agent);
        ui::blank();
    }

    if result.filtered_unverified > 0 {
        ui::warn(&format!(
            "{} unverified agent(s) filtered out",
            result.filtered_unverified
        ));
    }
    for err in &result.errors {
        ui::warn(err);
    }
    if result.agents.is_empty() {
        ui::hint("Try `lad discover --url <base-url>` if mDNS is blocked on this network");
    }
}

fn print_agent(agent: &DiscoveredAgent) {
    ui::success(&agent.name);
    if !agent.description.is_empty() {
        ui::kv("Description", &agent.description);
    }
    ui::kv("Role", &agent.role);
    ui::kv("Card", &agent.agent_card_url);
    ui::kv("Source", &agent.source.to_string());
    if agent.verified {
        ui::kv_ok(
            "Verified",
            &format!("yes ({})", agent.verification_method),
        );
    } else {
        ui::kv_warn("Verified", "no");
    }
    let skills = agent.skill_ids();
    let capabilities = if skills.is_empty() {
        &agent.capabilities_preview
    } else {
        &skills
    };
    if !capabilities.is_empty() {
        ui::kv("Capabilities", &capabilities.join(", "));
    }
    if let Some(err) = &agent.verification_error {
        ui::kv_warn("Problem", err);
    }
}

// ---------------------------------------------------------------------------
// Interactive consent
// ---------------------------------------------------------------------------

/// Asks on the terminal before accepting each agent. Prompts go to stderr so
/// `--json` output stays clean.
struct TerminalConsent;

#[async_trait]
impl ConsentCallback for TerminalConsent {
    async fn request_consent(&self, request: &ConsentRequest) -> LadResult<ConsentResponse> {
        let display = request.to_display();
        tokio::task::spawn_blocking(move || {
            let stdin = std::io::stdin();
            prompt(&display, &mut stdin.lock(), &mut std::io::stderr())
        })
        .await
        .map_err(|e| LadError::Consent(format!("Consent prompt aborted: {e}")))?
    }
}

fn prompt(
    display: &ConsentDisplay,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> LadResult<ConsentResponse> {
    writeln!(out)?;
    writeln!(out, "Agent:        {}", display.agent_name)?;
    if !display.agent_description.is_empty() {
        writeln!(out, "Description:  {}", display.agent_description)?;
    }
    writeln!(out, "Role:         {}", display.agent_role)?;
    writeln!(out, "Source:       {}", display.source)?;
    if display.verified {
        writeln!(out, "Verified:     yes ({})", display.verification_method)?;
    } else {
        writeln!(out, "Verified:     NO")?;
    }
    if !display.capabilities.is_empty() {
        writeln!(out, "Capabilities: {}", display.capabilities.join(", "))?;
    }

    loop {
        write!(out, "Use this agent? [y/n/skip]: ")?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            // EOF: nobody is there to approve.
            return Ok(ConsentResponse::denied());
        }
        match parse_answer(&line) {
            Some(response) => return Ok(response),
            None => writeln!(out, "Please answer y, n, or skip.")?,
        }
    }
}

fn parse_answer(line: &str) -> Option<ConsentResponse> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(ConsentResponse::approved()),
        "n" | "no" => Some(ConsentResponse::denied()),
        "s" | "skip" => Some(ConsentResponse::deferred()),
        _ => None,
    }
}
