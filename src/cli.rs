//! Command line surface of the hook, as invoked by the ACME client.

use crate::challenge::ChallengeRequest;
use crate::error::Error;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_CONFIG_FILE: &str = "default.ini";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// INI file holding the `Login` credentials. Defaults to `default.ini` next to the
    /// executable.
    #[arg(short, long, env = "DNS01_HOOK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Publish the TXT record and wait until it has propagated.
    #[command(name = "deploy_challenge")]
    DeployChallenge(ChallengeArgs),

    /// Delete the TXT record.
    #[command(name = "clean_challenge")]
    CleanChallenge(ChallengeArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ChallengeArgs {
    pub domain: String,
    #[arg(allow_hyphen_values = true)]
    pub token: String,
    /// Further hook arguments (e.g. the validation value). Ignored.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    pub extra: Vec<String>,
}

impl Cli {
    /// The configuration path, falling back to `default.ini` in the executable's directory.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.config {
            return path.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_CONFIG_FILE)))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

impl ChallengeArgs {
    /// # Errors
    ///
    /// See [`ChallengeRequest::new`].
    pub fn request(&self) -> Result<ChallengeRequest, Error> {
        ChallengeRequest::new(self.domain.clone(), self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_and_clean_take_domain_then_token() {
        let cli = Cli::try_parse_from([
            "dns01-hook",
            "deploy_challenge",
            "example.com",
            "-token-",
            "validation",
        ])
        .unwrap();
        let Command::DeployChallenge(args) = cli.command else {
            panic!("expected deploy_challenge");
        };
        assert_eq!(args.domain, "example.com");
        assert_eq!(args.token, "-token-");
        assert_eq!(args.extra, ["validation"]);

        let cli = Cli::try_parse_from([
            "dns01-hook",
            "--config",
            "/etc/hook.ini",
            "clean_challenge",
            "example.com",
            "abc123",
        ])
        .unwrap();
        assert_eq!(cli.config_path(), PathBuf::from("/etc/hook.ini"));
        assert_eq!(
            cli.command,
            Command::CleanChallenge(ChallengeArgs {
                domain: "example.com".into(),
                token: "abc123".into(),
                extra: vec![],
            })
        );
    }

    #[test]
    fn other_hook_commands_are_rejected() {
        assert!(Cli::try_parse_from(["dns01-hook", "deploy_cert", "example.com"]).is_err());
        assert!(Cli::try_parse_from(["dns01-hook", "clean_challenge", "example.com"]).is_err());
    }

    #[test]
    fn default_config_sits_next_to_executable() {
        let cli = Cli::try_parse_from(["dns01-hook", "clean_challenge", "a.example", "t"]).unwrap();
        if std::env::var_os("DNS01_HOOK_CONFIG").is_none() {
            assert!(cli.config_path().ends_with(DEFAULT_CONFIG_FILE));
        }
    }
}
