//! cli::commands::repo
//!
//! Server-side repository commands: create, list, log.

use anyhow::{Context as _, Result};

use crate::cli::{Context, Session};
use crate::core::types::{RepoName, RepoRef};
use crate::remote::Remote;
use crate::ui::output;

/// Create a repository owned by the authenticated identity.
pub fn create(ctx: &Context, name: &str) -> Result<()> {
    let name = RepoName::new(name)?;
    let config = ctx.load_config()?;
    let session = Session::open(ctx, &config)?;

    let rt = tokio::runtime::Runtime::new()?;
    let repo = rt
        .block_on(
            session
                .remote
                .create_repository(&session.credentials, &name),
        )
        .with_context(|| format!("Failed to create repository '{}'", name))?;

    output::success(
        format!("Created {} (clone it with 'pit clone {}')", repo, repo),
        ctx.verbosity(),
    );
    Ok(())
}

/// List the authenticated identity's repositories, one per line.
pub fn list(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let session = Session::open(ctx, &config)?;

    let rt = tokio::runtime::Runtime::new()?;
    let names = rt
        .block_on(session.remote.list_repositories(&session.credentials))
        .context("Failed to list repositories")?;

    if names.is_empty() {
        output::print("No repositories.", ctx.verbosity());
    } else {
        println!("{}", output::format_list(&names, ""));
    }
    Ok(())
}

/// Show commit history, oldest first.
pub fn log(ctx: &Context, repo: Option<&str>) -> Result<()> {
    let config = ctx.load_config()?;
    let repo = match repo {
        Some(repo) => RepoRef::parse(repo)?,
        None => crate::workspace::Workspace::discover(&ctx.cwd, config.limits())?
            .repo()
            .clone(),
    };
    let session = Session::open(ctx, &config)?;

    let rt = tokio::runtime::Runtime::new()?;
    let history = rt
        .block_on(session.remote.log(&session.credentials, &repo))
        .with_context(|| format!("Failed to read history of {}", repo))?;

    for summary in &history {
        println!("{}", output::format_commit(summary));
    }
    Ok(())
}
