// File: testing-framework/src/config/mod.rs
//
// Harness Configuration
//
// Every setting has a default matching the layout of a gateway build
// directory, so a run without a configuration file works out of the box. A
// YAML file may override any subset of the fields.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete harness configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Component endpoint the gateway connects to
    pub component: ComponentConfig,
    /// Gateway process under test
    pub gateway: GatewayConfig,
    /// Auxiliary IRC server process
    pub irc_server: IrcServerConfig,
    /// Timeouts applied while driving a scenario
    pub timeouts: TimeoutConfig,
    /// Directory receiving log files and failure artifacts
    pub output_dir: PathBuf,
}

impl HarnessConfig {
    /// Load a configuration file, filling unspecified fields with defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse a YAML configuration document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: HarnessConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        self.component.listen_addr()?;
        if self.component.jid.is_empty() {
            anyhow::bail!("component.jid must not be empty");
        }
        if self.timeouts.expect_secs == 0 {
            anyhow::bail!("timeouts.expect_secs must be positive");
        }
        Ok(())
    }

    /// Path of a file inside the output directory
    pub fn output_path(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

/// Component protocol endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentConfig {
    /// Address the harness listens on
    pub listen: String,
    /// JID the gateway serves
    pub jid: String,
    /// Shared secret of the component handshake
    pub password: String,
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8811".to_string(),
            jid: "biboumi.localhost".to_string(),
            password: "coucou".to_string(),
        }
    }
}

impl ComponentConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .with_context(|| format!("Invalid component listen address '{}'", self.listen))
    }
}

/// Gateway binary and the files it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub binary: PathBuf,
    /// Configuration file written before each scenario
    pub config_path: PathBuf,
    /// Database file removed before each scenario
    pub db_path: PathBuf,
    /// Run under valgrind's leak checker
    pub valgrind: bool,
    /// Directory holding `biboumi.supp`
    pub valgrind_suppressions_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("./biboumi"),
            config_path: PathBuf::from("test.conf"),
            db_path: PathBuf::from("e2e_test.sqlite"),
            valgrind: false,
            valgrind_suppressions_dir: None,
        }
    }
}

/// Exit code valgrind reports when it found errors
pub const VALGRIND_ERROR_EXIT_CODE: i32 = 16;

impl GatewayConfig {
    /// Program and arguments used to launch the gateway
    pub fn command_line(&self) -> (String, Vec<String>) {
        let binary = self.binary.display().to_string();
        let config = self.config_path.display().to_string();
        if !self.valgrind {
            return (binary, vec![config]);
        }

        let mut args = Vec::new();
        if let Some(dir) = &self.valgrind_suppressions_dir {
            args.push(format!("--suppressions={}", dir.join("biboumi.supp").display()));
        }
        args.extend(
            [
                "--leak-check=full",
                "--show-leak-kinds=all",
                "--errors-for-leak-kinds=all",
            ]
            .map(String::from),
        );
        args.push(format!("--error-exitcode={}", VALGRIND_ERROR_EXIT_CODE));
        args.push(binary);
        args.push(config);
        ("valgrind".to_string(), args)
    }
}

/// Auxiliary IRC server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrcServerConfig {
    /// Start the server before the first scenario
    pub enabled: bool,
    pub program: String,
    pub args: Vec<String>,
    /// Line printed on stderr once the server accepts connections
    pub ready_marker: String,
    /// File receiving the server's stderr
    pub output_file: PathBuf,
}

impl Default for IrcServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "charybdis".to_string(),
            args: vec![
                "-foreground".to_string(),
                "-configfile".to_string(),
                "../tests/end_to_end/ircd.conf".to_string(),
            ],
            ready_marker: "now running in foreground mode".to_string(),
            output_file: PathBuf::from("irc_output.txt"),
        }
    }
}

/// Timeouts, in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Waiting for the gateway to connect
    pub accept_secs: u64,
    /// Waiting for each expected stanza
    pub expect_secs: u64,
    /// Waiting for the gateway to exit after being signalled
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            accept_secs: 10,
            expect_secs: 60,
            shutdown_secs: 10,
        }
    }
}

impl TimeoutConfig {
    pub fn accept(&self) -> Duration {
        Duration::from_secs(self.accept_secs)
    }

    pub fn expect(&self) -> Duration {
        Duration::from_secs(self.expect_secs)
    }

    pub fn shutdown(&self) -> Duration {
        Duration::from_secs(self.shutdown_secs)
    }
}

/// Gateway configuration file flavour a scenario runs against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigVariant {
    #[default]
    Basic,
    /// Every user is bound to a single IRC server
    FixedServer,
    /// Channels are persistent unless configured otherwise
    PersistentByDefault,
}

impl ConfigVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigVariant::Basic => "basic",
            ConfigVariant::FixedServer => "fixed_server",
            ConfigVariant::PersistentByDefault => "persistent_by_default",
        }
    }

    /// Render the gateway configuration file
    pub fn render(&self, component: &ComponentConfig, gateway: &GatewayConfig) -> Result<String> {
        let port = component.listen_addr()?.port();
        let mut entries = vec![
            ("hostname", component.jid.clone()),
            ("password", component.password.clone()),
            ("db_name", gateway.db_path.display().to_string()),
            ("port", port.to_string()),
        ];
        match self {
            ConfigVariant::Basic => {
                entries.push(("admin", "admin@example.com".to_string()));
                entries.push(("identd_port", "1113".to_string()));
                entries.push(("outgoing_bind", "127.0.0.1".to_string()));
            }
            ConfigVariant::FixedServer => {
                entries.push(("fixed_irc_server", "irc.localhost".to_string()));
                entries.push(("admin", "admin@example.com".to_string()));
                entries.push(("identd_port", "1113".to_string()));
            }
            ConfigVariant::PersistentByDefault => {
                entries.push(("persistent_by_default", "true".to_string()));
            }
        }

        let mut out = String::new();
        for (key, value) in entries {
            out.push_str(key);
            out.push('=');
            out.push_str(&value);
            out.push('\n');
        }
        Ok(out)
    }
}

impl fmt::Display for ConfigVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.component.listen, "127.0.0.1:8811");
        assert_eq!(config.component.jid, "biboumi.localhost");
        assert_eq!(config.gateway.binary, PathBuf::from("./biboumi"));
        assert_eq!(config.timeouts.expect(), Duration::from_secs(60));
        assert!(config.irc_server.enabled);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = HarnessConfig::from_yaml(
            r#"
gateway:
  binary: "/usr/local/bin/biboumi"
  valgrind: true
timeouts:
  expect_secs: 5
"#,
        )
        .unwrap();
        assert_eq!(config.gateway.binary, PathBuf::from("/usr/local/bin/biboumi"));
        assert!(config.gateway.valgrind);
        assert_eq!(config.gateway.config_path, PathBuf::from("test.conf"));
        assert_eq!(config.timeouts.expect_secs, 5);
        assert_eq!(config.timeouts.shutdown_secs, 10);
        assert_eq!(config.component.password, "coucou");
    }

    #[test]
    fn test_invalid_listen_address_is_rejected() {
        assert!(HarnessConfig::from_yaml("component:\n  listen: \"nowhere\"\n").is_err());
    }

    #[test]
    fn test_render_basic() {
        let rendered = ConfigVariant::Basic
            .render(&ComponentConfig::default(), &GatewayConfig::default())
            .unwrap();
        assert_eq!(
            rendered,
            "hostname=biboumi.localhost\npassword=coucou\ndb_name=e2e_test.sqlite\nport=8811\n\
             admin=admin@example.com\nidentd_port=1113\noutgoing_bind=127.0.0.1\n"
        );
    }

    #[test]
    fn test_render_variants() {
        let component = ComponentConfig::default();
        let gateway = GatewayConfig::default();
        let fixed = ConfigVariant::FixedServer.render(&component, &gateway).unwrap();
        assert!(fixed.contains("fixed_irc_server=irc.localhost\n"));
        assert!(!fixed.contains("outgoing_bind"));
        let persistent = ConfigVariant::PersistentByDefault
            .render(&component, &gateway)
            .unwrap();
        assert!(persistent.contains("persistent_by_default=true\n"));
        assert!(!persistent.contains("admin="));
    }

    #[test]
    fn test_valgrind_command_line() {
        let gateway = GatewayConfig {
            valgrind: true,
            valgrind_suppressions_dir: Some(PathBuf::from("/supp")),
            ..GatewayConfig::default()
        };
        let (program, args) = gateway.command_line();
        assert_eq!(program, "valgrind");
        assert_eq!(args[0], "--suppressions=/supp/biboumi.supp");
        assert!(args.contains(&"--error-exitcode=16".to_string()));
        assert_eq!(args[args.len() - 2..], ["./biboumi", "test.conf"]);
    }

    #[test]
    fn test_plain_command_line() {
        let (program, args) = GatewayConfig::default().command_line();
        assert_eq!(program, "./biboumi");
        assert_eq!(args, vec!["test.conf"]);
    }

    #[test]
    fn test_variant_serde_names() {
        let v: ConfigVariant = serde_yaml::from_str("fixed_server").unwrap();
        assert_eq!(v, ConfigVariant::FixedServer);
        assert_eq!(v.to_string(), "fixed_server");
    }
}
