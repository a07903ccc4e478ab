//! Core types for Local Agent Discovery (LAD).
//!
//! This crate defines the data structures shared by the discovery client and
//! the advertising server: discovered agents and discovery results, AgentCards
//! and their authentication requirements, consent requests, configuration, and
//! the ES256 signing scheme for AgentCards. It performs no networking.

pub mod agent;
pub mod auth;
pub mod card;
pub mod card_signing;
pub mod config;
pub mod consent;
pub mod error;

/// mDNS/DNS-SD service type advertised by LAD servers.
pub const SERVICE_TYPE: &str = "_a2a._tcp.local.";

/// Path of the LAD discovery endpoint, relative to a base URL.
pub const DISCOVERY_PATH: &str = "/.well-known/lad/agents";

/// Path of the A2A AgentCard endpoint.
pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";

/// LAD protocol version emitted in discovery responses.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Media type of a compact JWS AgentCard.
pub const JOSE_MEDIA_TYPE: &str = "application/jose";
