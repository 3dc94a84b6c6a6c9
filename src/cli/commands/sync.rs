//! cli::commands::sync
//!
//! Working directory commands: clone, commit, push, pull, status.
//!
//! # Example
//!
//! ```bash
//! pit clone alice/notes
//! cd notes
//! echo hi > a.txt
//! pit commit -m "first"
//! pit push
//! pit pull 002_first
//! ```

use anyhow::{Context as _, Result};

use crate::cli::{Context, Session};
use crate::core::types::RepoRef;
use crate::ui::output;
use crate::workspace::{PushReport, Workspace, WorkspaceError};

/// Clone a repository into `<cwd>/<name>`.
pub fn clone(ctx: &Context, repo: &str) -> Result<()> {
    let repo = RepoRef::parse(repo)?;
    let config = ctx.load_config()?;
    let session = Session::open(ctx, &config)?;

    let rt = tokio::runtime::Runtime::new()?;
    let (workspace, report) = rt
        .block_on(Workspace::clone_into(
            &ctx.cwd,
            &session.remote,
            &session.credentials,
            &repo,
            session.limits,
        ))
        .with_context(|| format!("Failed to clone {}", repo))?;

    output::success(
        format!(
            "Cloned {} at {} into {} ({} file(s))",
            repo,
            report.commit,
            workspace.work_dir().display(),
            report.files.len()
        ),
        ctx.verbosity(),
    );
    Ok(())
}

/// Stage the working tree, optionally pushing right away.
pub fn commit(ctx: &Context, message: &str, push: bool) -> Result<()> {
    let config = ctx.load_config()?;
    let workspace = Workspace::discover(&ctx.cwd, config.limits())?;

    if push {
        let session = Session::open(ctx, &config)?;
        let rt = tokio::runtime::Runtime::new()?;
        let report = rt
            .block_on(workspace.commit_and_push(&session.remote, &session.credentials, message))
            .context("Commit failed")?;
        report_push(ctx, &report);
        return Ok(());
    }

    match workspace.commit(message) {
        Ok(staged) => {
            output::success(
                format!("Staged {} (run 'pit push' to send it)", staged.id()),
                ctx.verbosity(),
            );
            Ok(())
        }
        Err(WorkspaceError::NoChanges) => {
            output::print("Nothing to commit, working tree clean.", ctx.verbosity());
            Ok(())
        }
        Err(e) => Err(e).context("Commit failed"),
    }
}

/// Replay staged commits to the server.
pub fn push(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let workspace = Workspace::discover(&ctx.cwd, config.limits())?;
    if workspace.staging().list()?.is_empty() {
        output::print("Nothing to push.", ctx.verbosity());
        return Ok(());
    }

    let session = Session::open(ctx, &config)?;
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt
        .block_on(workspace.push(&session.remote, &session.credentials))
        .context("Push failed; staged commits are kept, run 'pit push' again to resume")?;
    report_push(ctx, &report);
    Ok(())
}

fn report_push(ctx: &Context, report: &PushReport) {
    for id in &report.applied {
        output::success(format!("Pushed {}", id), ctx.verbosity());
    }
    if report.skipped > 0 {
        output::print(
            format!("{} commit(s) were already on the server", report.skipped),
            ctx.verbosity(),
        );
    }
}

/// Replace the working tree with a server commit.
pub fn pull(ctx: &Context, id: Option<&str>) -> Result<()> {
    let config = ctx.load_config()?;
    let workspace = Workspace::discover(&ctx.cwd, config.limits())?;

    let session = Session::open(ctx, &config)?;
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt
        .block_on(workspace.pull(&session.remote, &session.credentials, id))
        .context("Pull failed")?;

    output::success(
        format!("Now at {} ({} file(s))", report.commit, report.files.len()),
        ctx.verbosity(),
    );
    if report.pending > 0 {
        output::warn(
            format!(
                "{} staged commit(s) have not been pushed and no longer match the working tree",
                report.pending
            ),
            ctx.verbosity(),
        );
    }
    Ok(())
}

/// Show how the working tree differs from the last known snapshot.
pub fn status(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let workspace = Workspace::discover(&ctx.cwd, config.limits())?;
    let status = workspace.status()?;

    println!("Repository: {}", workspace.repo());
    match &status.base {
        Some(base) => println!("Base: {}", base),
        None => println!("Base: none"),
    }
    if status.pending > 0 {
        println!("Staged, not pushed: {}", status.pending);
    }
    println!("{}", output::format_diff(&status.diff));
    Ok(())
}
