//! `lad keygen`: create an AgentCard signing key pair.

use crate::{init_tracing, ui};
use lad_types::card_signing::{generate_signing_keys, key_fingerprint, PRIVATE_KEY_FILE};
use std::path::Path;

pub fn cmd_keygen(dir: &Path) -> i32 {
    init_tracing("warn");

    let existing = dir.join(PRIVATE_KEY_FILE);
    if existing.exists() {
        ui::error_with_fix(
            &format!("{} already exists", existing.display()),
            "Choose another directory or remove the old key first",
        );
        return 1;
    }

    let (private, public) = match generate_signing_keys(dir) {
        Ok(paths) => paths,
        Err(e) => {
            ui::error(&format!("Failed to generate keys: {e}"));
            return 1;
        }
    };
    let kid = match std::fs::read_to_string(&public) {
        Ok(pem) => key_fingerprint(&pem),
        Err(e) => {
            ui::error(&format!("Failed to read {}: {e}", public.display()));
            return 1;
        }
    };

    ui::success("Generated ES256 signing key pair");
    ui::kv("Private key", &private.display().to_string());
    ui::kv("Public key", &public.display().to_string());
    ui::kv("Key id", &kid);
    ui::blank();
    ui::hint(&format!(
        "Serve with: lad serve --signing-key {} --signing-key-id {kid}",
        private.display()
    ));
    ui::hint(&format!(
        "Clients verify with: lad discover --signing-public-key {}",
        public.display()
    ));
    0
}
