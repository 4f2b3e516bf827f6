mod render;

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pygloss::{Explainer, OpenAiExplainer, Policy, ReviewOptions, Sandbox, review};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pygloss")]
#[command(about = "Explain a Python snippet; optionally run it in a restricted sandbox")]
struct Args {
    /// Python file to explain, or '-' to read from stdin
    #[arg(default_value = "-")]
    input: PathBuf,

    /// Execute the snippet in the restricted sandbox
    #[arg(long)]
    run: bool,

    /// Ask an LLM for a narrated explanation (requires OPENAI_API_KEY)
    #[arg(long)]
    llm: bool,

    /// LLM model to use
    #[arg(long, default_value = "gpt-4o-mini", env = "PYGLOSS_MODEL")]
    model: String,

    /// Sandbox wall-clock ceiling in milliseconds
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    /// Emit machine-readable JSON instead of the formatted report
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let code = read_submission(&args.input)?;

    let policy = Policy::default().with_time_limit(Duration::from_millis(args.timeout_ms));
    let sandbox = Sandbox::with_policy(policy);
    let explainer = OpenAiExplainer::from_env().map(|e| e.with_model(&args.model));

    let options = ReviewOptions {
        run_sandbox: args.run,
        use_llm: args.llm,
    };
    let result = review(
        &code,
        &options,
        &sandbox,
        explainer.as_ref().map(|e| e as &dyn Explainer),
    )
    .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        render::print_review(&result, args.llm && explainer.is_none());
    }
    Ok(())
}

fn read_submission(input: &PathBuf) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut code = String::new();
        std::io::stdin()
            .read_to_string(&mut code)
            .context("reading snippet from stdin")?;
        Ok(code)
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("reading snippet from {}", input.display()))
    }
}
