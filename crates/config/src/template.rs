//! Default configuration template with all options documented.
//!
//! Written by `tidings init` so users can see everything that can be
//! configured even if they keep the defaults.

/// Generate the default config template.
pub fn default_config_template() -> String {
    r##"# Tidings Configuration
# =====================
# Uncomment and modify settings as needed.
# Changes require a restart of `tidings serve` to take effect.
#
# Environment variable substitution is supported: ${ENV_VAR}
# Example: webhook_url = "${TIDINGS_WEBHOOK_URL}"

# ══════════════════════════════════════════════════════════════════════════════
# STREAMS
# ══════════════════════════════════════════════════════════════════════════════

[streams]
path = "notification_streams.toml"    # Stream definitions and subscribers (relative to this file)

# ══════════════════════════════════════════════════════════════════════════════
# EVENT SOURCES
# ══════════════════════════════════════════════════════════════════════════════
# A stream's `source` is either the name of a built-in source or the path of
# an executable that prints a JSON array of events on stdout.

[sources]
timeout_secs = 60                     # Max runtime of one source invocation

# ══════════════════════════════════════════════════════════════════════════════
# SCHEDULE
# ══════════════════════════════════════════════════════════════════════════════

[schedule]
enabled = true                        # Run the daily dispatch under `tidings serve`
time = "12:05"                        # Local time of the daily run (HH:MM)
timezone = "Etc/GMT+8"                # IANA timezone; Etc/GMT+8 is UTC-08:00

# ══════════════════════════════════════════════════════════════════════════════
# DELIVERY
# ══════════════════════════════════════════════════════════════════════════════

[delivery]
kind = "console"                      # "console" prints messages, "webhook" POSTs them
# webhook_url = "${TIDINGS_WEBHOOK_URL}"
# token = "${TIDINGS_WEBHOOK_TOKEN}"  # Sent as a bearer token
timeout_secs = 10                     # Webhook request timeout
"##
    .to_string()
}
