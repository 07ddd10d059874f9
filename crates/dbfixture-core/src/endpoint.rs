//! Connection endpoint rendering
//!
//! Templates use ordered placeholders: `{0}` data source, `{1}` catalog,
//! `{2}` password. Substitution is verbatim; a host or catalog containing
//! `;` or `=` will corrupt the resulting connection string.

use dbfixture_core_types::Sensitive;
use std::fmt;

/// A connection string template with ordered placeholders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionTemplate(&'static str);

impl ConnectionTemplate {
    pub const fn new(template: &'static str) -> Self {
        Self(template)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Substitute `{N}` with `values[N]`; unknown placeholders are left as is
    ///
    /// The template is scanned once, so substituted values are never
    /// themselves searched for placeholders.
    pub fn render(&self, values: &[&str]) -> String {
        let mut rendered = String::with_capacity(self.0.len());
        let mut rest = self.0;
        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let tail = &rest[open..];
            let value = tail.find('}').and_then(|close| {
                let index = tail[1..close].parse::<usize>().ok()?;
                values.get(index).map(|value| (*value, close))
            });
            match value {
                Some((value, close)) => {
                    rendered.push_str(value);
                    rest = &tail[close + 1..];
                }
                None => {
                    rendered.push('{');
                    rest = &tail[1..];
                }
            }
        }
        rendered.push_str(rest);
        rendered
    }
}

pub const LOCAL_MASTER: ConnectionTemplate = ConnectionTemplate::new(
    "Data Source={0};Initial Catalog=master;Integrated Security=True",
);

pub const LOCAL_DATABASE: ConnectionTemplate = ConnectionTemplate::new(
    "Data Source={0};Initial Catalog={1};Integrated Security=True;MultipleActiveResultSets=True",
);

pub const CONTAINER_MASTER: ConnectionTemplate = ConnectionTemplate::new(
    "Data Source={0};Initial Catalog=master;Persist Security Info=True;User ID=sa;Password={2};Pooling=False;MultipleActiveResultSets=False;Connect Timeout=60;TrustServerCertificate=True",
);

pub const CONTAINER_DATABASE: ConnectionTemplate = ConnectionTemplate::new(
    "Data Source={0};Initial Catalog={1};Persist Security Info=True;User ID=sa;Password={2};Pooling=False;MultipleActiveResultSets=False;Connect Timeout=60;TrustServerCertificate=True",
);

/// Catalog name used by the admin templates
pub const MASTER_CATALOG: &str = "master";

/// A rendered connection string plus the parts it was built from
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionEndpoint {
    data_source: String,
    catalog: String,
    connection_string: Sensitive<String>,
}

impl ConnectionEndpoint {
    /// Data source in `host` or `host,port` form
    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    /// The full connection string, credentials included
    pub fn connection_string(&self) -> &str {
        self.connection_string.expose()
    }

    /// Case-insensitive lookup of a `key=value` pair
    pub fn value(&self, key: &str) -> Option<&str> {
        self.connection_string
            .expose()
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
            .map(|(_, v)| v.trim())
    }

    /// Whether a boolean-valued key is set to `True`
    pub fn flag(&self, key: &str) -> bool {
        self.value(key)
            .map(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
            .unwrap_or(false)
    }
}

impl fmt::Debug for ConnectionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionEndpoint")
            .field("data_source", &self.data_source)
            .field("catalog", &self.catalog)
            .field("connection_string", &self.connection_string)
            .finish()
    }
}

impl fmt::Display for ConnectionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.data_source, self.catalog)
    }
}

/// `host` alone, or `host,port` when a port is published
pub fn data_source(host: &str, port: Option<u16>) -> String {
    match port {
        Some(port) => format!("{},{}", host, port),
        None => host.to_string(),
    }
}

/// Render `template` for the given host, optional port and catalog
pub fn build(
    template: ConnectionTemplate,
    host: &str,
    port: Option<u16>,
    catalog: &str,
) -> ConnectionEndpoint {
    build_with_password(template, host, port, catalog, "")
}

/// Render `template`, also filling the `{2}` password slot
pub fn build_with_password(
    template: ConnectionTemplate,
    host: &str,
    port: Option<u16>,
    catalog: &str,
    password: &str,
) -> ConnectionEndpoint {
    let data_source = data_source(host, port);
    let connection_string = template.render(&[&data_source, catalog, password]);
    let catalog = if template.as_str().contains("{1}") {
        catalog.to_string()
    } else {
        MASTER_CATALOG.to_string()
    };
    ConnectionEndpoint {
        data_source,
        catalog,
        connection_string: Sensitive::new(connection_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let template = ConnectionTemplate::new("a={0};b={5}");
        assert_eq!(template.render(&["x"]), "a=x;b={5}");
    }

    #[test]
    fn test_render_does_not_rescan_substituted_values() {
        let template = ConnectionTemplate::new("a={0};b={1}");
        assert_eq!(template.render(&["{1}", "y"]), "a={1};b=y");
    }

    #[test]
    fn test_master_template_reports_master_catalog() {
        let endpoint = build(LOCAL_MASTER, "(local)", None, "SampleDB");
        assert_eq!(endpoint.catalog(), "master");
        assert!(!endpoint.connection_string().contains("SampleDB"));
    }

    #[test]
    fn test_debug_redacts_connection_string() {
        let endpoint = build_with_password(CONTAINER_DATABASE, "127.0.0.1", Some(50000), "db", "pw!");
        let debug = format!("{:?}", endpoint);
        assert!(!debug.contains("pw!"));
        assert!(debug.contains("127.0.0.1,50000"));
    }
}
