// src/cli.rs
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{error, info};

use crate::app::App;
use crate::auth::HostedAuthProvider;
use crate::core::{FsOps, ResumeBackend, ServiceClient};
use crate::environment::AppConfig;
use crate::error::WorkflowError;
use crate::report;
use crate::router::Page;
use crate::upload::mime_for_file_name;
use crate::workflow::{Workflow, WorkflowState};

#[derive(Parser)]
#[command(name = "resume-optimizer")]
#[command(about = "Tailor a resume and cover letter to a job description")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Location the app was opened at; OAuth redirects land on /auth/callback
    #[arg(long, default_value = "/", global = true)]
    pub location: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long, env = "RESUME_OPTIMIZER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long, env = "RESUME_OPTIMIZER_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Sign out and forget the stored session
    Signout,
    /// Show the signed-in user
    Whoami,
    /// Complete an OAuth redirect from its full URL
    Callback { url: String },
    /// Analyze a resume against a job description
    Run(RunArgs),
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Resume PDF, or `-` to read it from stdin
    #[arg(long)]
    pub resume: PathBuf,

    /// File name declared for a resume read from stdin
    #[arg(long, default_value = "resume.pdf")]
    pub resume_name: String,

    /// Job description text
    #[arg(long, conflicts_with = "job_file", required_unless_present = "job_file")]
    pub job: Option<String>,

    /// File holding the job description
    #[arg(long)]
    pub job_file: Option<PathBuf>,

    /// Also generate a cover letter
    #[arg(long)]
    pub cover_letter: bool,

    /// Also export the cover letter as PDF (implies --cover-letter)
    #[arg(long)]
    pub pdf: bool,

    /// Where the PDF goes; defaults to the configured output path
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Open the cover letter in a browser window
    #[arg(long)]
    pub preview: bool,

    /// Copy a result to the clipboard
    #[arg(long, value_enum)]
    pub copy: Option<CopyTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CopyTarget {
    Keywords,
    Suggestions,
    Letter,
}

impl CopyTarget {
    fn tag(self) -> &'static str {
        match self {
            CopyTarget::Keywords => "keywords",
            CopyTarget::Suggestions => "suggestions",
            CopyTarget::Letter => "cover-letter",
        }
    }

    fn text(self, state: &WorkflowState) -> Option<String> {
        match self {
            CopyTarget::Keywords => state.analysis.as_ref().map(|a| a.keywords_for_submission()),
            CopyTarget::Suggestions => state.analysis.as_ref().map(|a| a.suggestions.clone()),
            CopyTarget::Letter => state.cover_letter.clone(),
        }
    }
}

/// Prints each notification once, the first time it shows up.
#[derive(Default)]
pub struct NotificationPrinter {
    seen: Vec<u64>,
}

impl NotificationPrinter {
    pub fn print_new(&mut self, state: &WorkflowState) {
        for notification in [state.notifications.success(), state.notifications.error()]
            .into_iter()
            .flatten()
        {
            if !self.seen.contains(&notification.id) {
                self.seen.push(notification.id);
                println!("{}", report::render_notification(notification));
            }
        }
    }
}

pub async fn handle_command(cli: Cli, config: AppConfig) -> Result<()> {
    let provider = Arc::new(
        HostedAuthProvider::new(config.auth.clone())
            .context("Set AUTH_URL and AUTH_ANON_KEY or the auth section of config.yaml")?,
    );
    let client = ServiceClient::new(&config.api_url, config.timeout_seconds)?;
    info!("Backend: {}", client.base_url());

    let mut app = App::new(Workflow::new(client), provider, &cli.location);
    let page = app.start().await;

    match cli.command {
        Command::Signin { email, password } => {
            app.navigate(Page::SignIn);
            match app.sign_in(&email, &password).await {
                Ok(_) => println!("✅ Signed in as {}", email),
                Err(e) => {
                    error!("Sign-in failed: {}", e);
                    bail!("Sign-in failed: {}", e);
                }
            }
        }

        Command::Signup {
            email,
            password,
            name,
        } => {
            app.navigate(Page::SignUp);
            app.sign_up(&email, &password, name.as_deref())
                .await
                .context("Sign-up failed")?;
            match app.session() {
                Some(session) => println!("✅ Account created, signed in as {}", session.name),
                None => println!("📧 Check {} to confirm your account", email),
            }
        }

        Command::Signout => match app.sign_out().await {
            Ok(_) => println!("✅ Signed out"),
            Err(e) => {
                println!("✅ Signed out locally");
                bail!("Provider sign-out failed: {}", e);
            }
        },

        Command::Whoami => match app.session() {
            Some(session) => {
                println!("{} <{}>", session.name, session.email);
                println!("   ID: {}", session.id);
            }
            None => println!("Not signed in (page: {})", page),
        },

        Command::Callback { url } => {
            let page = app.complete_callback(&url).await.context("OAuth callback failed")?;
            println!("✅ Signed in, now on {}", page);
        }

        Command::Run(args) => {
            let Some(workflow) = app.workspace() else {
                bail!("Not signed in. Run `resume-optimizer signin` first.");
            };
            if let Err(e) = run_workflow(workflow, args, &config).await {
                if let Some(hint) = e
                    .downcast_ref::<WorkflowError>()
                    .and_then(report::render_validation_hint)
                {
                    println!("{}", hint);
                }
                return Err(e);
            }
        }
    }

    Ok(())
}

async fn run_workflow<B: ResumeBackend + 'static>(
    workflow: &Workflow<B>,
    args: RunArgs,
    config: &AppConfig,
) -> Result<()> {
    let mut printer = NotificationPrinter::default();

    let submitted = if args.resume.as_os_str() == "-" {
        let mut bytes = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut bytes)
            .await
            .context("Failed to read resume from stdin")?;
        workflow.submit_bytes(
            args.resume_name.clone(),
            mime_for_file_name(&args.resume_name),
            bytes,
        )
    } else {
        workflow.submit_path(&args.resume).await
    };
    printer.print_new(&workflow.snapshot());
    submitted?;

    let job_description = match (args.job, args.job_file) {
        (Some(text), _) => text,
        (None, Some(path)) => FsOps::read_file_safe(&path).await?,
        (None, None) => bail!("Provide --job or --job-file"),
    };
    workflow.set_job_description(job_description);

    let analyzed = workflow.analyze().await;
    printer.print_new(&workflow.snapshot());
    let analysis = analyzed?;
    println!();
    print!("{}", report::render_analysis(&analysis));

    if args.cover_letter || args.pdf || args.preview || args.copy == Some(CopyTarget::Letter) {
        let generated = workflow.generate_cover_letter().await;
        printer.print_new(&workflow.snapshot());
        let letter = generated?;
        println!();
        print!("{}", report::render_cover_letter(&letter));
    }

    if args.pdf {
        let out_dir = args.out_dir.unwrap_or_else(|| config.output_path.clone());
        let exported = workflow.download_pdf(&out_dir).await;
        printer.print_new(&workflow.snapshot());
        exported?;
    }

    if args.preview {
        workflow.preview_cover_letter().await;
        printer.print_new(&workflow.snapshot());
    }

    if let Some(target) = args.copy {
        if let Some(text) = target.text(&workflow.snapshot()) {
            workflow.copy_to_clipboard(&text, Some(target.tag())).await;
            printer.print_new(&workflow.snapshot());
        }
    }

    Ok(())
}
