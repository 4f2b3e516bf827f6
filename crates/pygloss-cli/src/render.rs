use colored::*;
use pygloss::{ExplanationResult, Review, SandboxResult};

pub fn print_review(review: &Review, llm_requested_without_credential: bool) {
    print_section("Structure");
    for line in review.summary.digest_lines() {
        println!("  • {}", line);
    }
    println!();

    if let Some(result) = &review.sandbox {
        print_section("Sandbox");
        print_sandbox(result);
        println!();
    }

    if let Some(explanation) = &review.explanation {
        print_section("Explanation");
        match explanation {
            ExplanationResult::Text { text } => println!("{}", text),
            ExplanationResult::Failed { reason } => {
                println!("  {}", format!("explanation unavailable: {}", reason).yellow());
            }
        }
        println!();
    } else if llm_requested_without_credential {
        println!(
            "{}",
            format!(
                "  (LLM mode is off: {} is not set)",
                pygloss::API_KEY_ENV
            )
            .bright_black()
        );
    }
}

fn print_section(title: &str) {
    let rule = "─".repeat(60_usize.saturating_sub(title.len() + 4));
    println!("{}", format!("── {} {}", title, rule).bright_black());
}

fn print_sandbox(result: &SandboxResult) {
    match result {
        SandboxResult::Completed { output } => {
            if output.trim().is_empty() {
                println!("  {}", "program ran with no output".bright_black());
            } else {
                for line in output.lines() {
                    println!("  {}", line);
                }
            }
        }
        SandboxResult::Refused { reason, output } => {
            if !output.is_empty() {
                for line in output.lines() {
                    println!("  {}", line);
                }
            }
            println!("  {}", format!("✗ {}", reason).red());
        }
    }
}
