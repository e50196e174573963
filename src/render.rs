//! Config synthesizer.
//!
//! Pure function mapping `(port, proxy auth token, authenticator contract,
//! spawner contract)` to the rendered Python configuration document. No I/O;
//! identical inputs always produce byte-identical output — the
//! restart-on-change rule depends on that to avoid spurious restarts.

use std::fmt::Write;

use crate::provider::ProviderContract;

pub struct RenderContext<'a> {
    pub port: u16,
    pub proxy_auth_token: &'a str,
    /// Absent in the authenticator-less variant.
    pub authenticator: Option<&'a ProviderContract>,
    pub spawner: &'a ProviderContract,
}

/// Render the configuration document.
pub fn render_config(ctx: &RenderContext) -> String {
    let mut out = String::new();
    out.push_str("# jupyterhub_config.py\n");
    out.push_str("# Generated by hubkeeper. Manual edits are overwritten on the next\n");
    out.push_str("# reconciliation pass.\n\n");

    let _ = writeln!(out, "c.JupyterHub.port = {}", ctx.port);
    let _ = writeln!(
        out,
        "c.ConfigurableHTTPProxy.auth_token = {}",
        quote(ctx.proxy_auth_token)
    );

    if let Some(authenticator) = ctx.authenticator {
        out.push('\n');
        let _ = writeln!(
            out,
            "c.JupyterHub.authenticator_class = {}",
            quote(&authenticator.class)
        );
        render_provider_config(&mut out, authenticator);
    }

    out.push('\n');
    let _ = writeln!(
        out,
        "c.JupyterHub.spawner_class = {}",
        quote(&ctx.spawner.class)
    );
    render_provider_config(&mut out, ctx.spawner);

    out
}

/// One `c.<LeafClass>.<key> = <literal>` line per config entry, sorted by key
/// (the contract's map is a BTreeMap, so iteration is already ordered).
fn render_provider_config(out: &mut String, contract: &ProviderContract) {
    let class = leaf_class(&contract.class);
    for (key, value) in &contract.config {
        let _ = writeln!(out, "c.{}.{} = {}", class, key, python_literal(value));
    }
}

/// Last dot-segment of a class identifier:
/// `ldapauthenticator.LDAPAuthenticator` -> `LDAPAuthenticator`.
fn leaf_class(class: &str) -> &str {
    class.rsplit('.').next().unwrap_or(class)
}

/// Serialize an opaque JSON value in Python literal syntax. Object keys are
/// emitted sorted for determinism.
pub fn python_literal(value: &serde_json::Value) -> String {
    use serde_json::Value;
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(python_literal).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by_key(|(k, _)| *k);
            let inner: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), python_literal(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}
