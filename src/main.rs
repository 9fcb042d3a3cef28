use anyhow::{anyhow, Result};
use clap::Parser;
use dns01_hook::cli::{Cli, Command};
use dns01_hook::{publisher, Config, Hook, PropagationChecker, SystemResolver};
use is_terminal::IsTerminal;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_init();

    let cli = Cli::parse();
    let config_path = cli.config_path();
    let config = Config::try_from_file(&config_path)?;
    tracing::debug!("loaded config from {}", config_path.display());

    tokio::select! {
        res = run(cli.command, config) => res,
        () = shutdown_signal() => {
            tracing::warn!("interrupted, giving up on the challenge");
            Err(anyhow!("interrupted"))
        }
    }
}

async fn run(command: Command, config: Config) -> Result<()> {
    let publisher = publisher::from_config(&config).await?;
    let resolver = SystemResolver::new(&config.nameservers, config.propagation.query_timeout)?;
    let hook = Hook::new(publisher, PropagationChecker::new(resolver, config.propagation));

    match command {
        Command::DeployChallenge(args) => {
            hook.deploy_challenge(args.request()?).await?;
        }
        Command::CleanChallenge(args) => {
            hook.clean_challenge(args.request()?).await?;
        }
    }
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal()),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dns01_hook=info".into()),
        )
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("unable to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("unable to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
