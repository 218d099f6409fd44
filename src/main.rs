use clap::Parser;
use color_eyre::Result;
use congrega::{
    Config, Database, Profile, Session,
    cli::{self, Cli, Commands},
    session::StaticCredentials,
    utils::expand_path,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    color_eyre::install()?;

    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // --dev keeps a separate config and database
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_path(&expand_path(path), profile)?,
        None => Config::load_with_profile(profile)?,
    };

    let db_path = config.get_database_path();
    let db = Database::new(
        db_path
            .to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?,
    )?;

    let credentials = StaticCredentials::from_config(&config);
    let session = Session::login(&credentials, cli.user.as_deref(), cli.password.as_deref())?;

    let command = cli.command.unwrap_or(Commands::Dashboard);
    let outcome = cli::run(command, &config, &db, &session);
    session.logout();
    outcome?;

    Ok(())
}
