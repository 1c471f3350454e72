use crate::models::{AuditResult, IssueSeverity, RunEntry, TipPriority};
use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;
use std::fs::File;
use std::io::Write;

pub struct Reporter;

impl Reporter {
    /// Plain-text rendering of one audit: header, numbered issues, generated tags, numbered tips
    pub fn export_text(result: &AuditResult) -> String {
        let divider = "-".repeat(60);
        let snapshot = &result.snapshot;
        let tags = &result.tags;

        let mut lines = vec![
            "SEO AUDIT REPORT".to_string(),
            "=".repeat(60),
            format!("URL: {}", result.url),
            format!("Score: {}/100", result.score),
            format!("Audited: {}", result.audited_at.to_rfc3339()),
            format!(
                "Words: {}  Headings: {}  Images: {}  Links: {}",
                snapshot.word_count,
                snapshot.headings.len(),
                snapshot.images.len(),
                snapshot.links.len()
            ),
            String::new(),
            format!("ISSUES ({})", result.issues.len()),
            divider.clone(),
        ];

        if result.issues.is_empty() {
            lines.push("No issues found.".to_string());
        }
        for (idx, issue) in result.issues.iter().enumerate() {
            lines.push(format!(
                "{}. [{}] {} — {}",
                idx + 1,
                issue.severity,
                issue.issue_type,
                issue.reason
            ));
            lines.push(format!("   Element:   {}", issue.element));
            if !issue.current.is_empty() {
                lines.push(format!("   Current:   {}", issue.current));
            }
            lines.push(format!("   Suggested: {}", issue.suggested));
            lines.push(format!("   Action:    {}", issue.action));
        }

        lines.extend([
            String::new(),
            "GENERATED TAGS".to_string(),
            divider.clone(),
            format!("Title:       {}", tags.title),
            format!("Description: {}", tags.description),
            format!("Keywords:    {}", tags.keywords.join(", ")),
            format!("Phrases:     {}", tags.phrases.join(", ")),
            format!("Canonical:   {}", tags.canonical),
            String::new(),
            tags.html.clone(),
            String::new(),
            "RANKING TIPS".to_string(),
            divider,
        ]);
        for (idx, tip) in tags.tips.iter().enumerate() {
            lines.push(format!("{}. [{}] {}", idx + 1, tip.priority, tip.message));
            lines.push(format!("   -> {}", tip.action));
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    pub fn print_audit(result: &AuditResult) {
        println!("\n{}", "=".repeat(80).bright_blue());
        println!("{}", "SEO Audit".bright_cyan().bold());
        println!("{}", "=".repeat(80).bright_blue());
        println!();

        println!("{}: {}", "URL".bright_white().bold(), result.url);
        println!(
            "{}: {}",
            "Score".bright_white().bold(),
            Self::colored_score(result.score)
        );
        println!(
            "{}: {}",
            "Timestamp".bright_white().bold(),
            result.audited_at.to_rfc3339()
        );
        println!();

        if result.issues.is_empty() {
            println!("{}", "No issues found".bright_green());
        } else {
            println!("{}", "Issues".bright_yellow().bold().underline());
            for issue in &result.issues {
                let severity_str = match issue.severity {
                    IssueSeverity::Critical => "CRIT ".bright_red(),
                    IssueSeverity::Warning => "WARN ".yellow(),
                    IssueSeverity::Info => "INFO ".bright_cyan(),
                };
                println!(
                    "  [{}] {} {}",
                    severity_str,
                    issue.issue_type.label().bright_white(),
                    format!("({})", issue.action).dimmed()
                );
                println!("        {}", issue.reason);
                println!("        {} {}", "->".bright_green(), issue.suggested);
            }
        }
        println!();

        println!("{}", "Generated Tags".bright_yellow().bold().underline());
        println!("  Title:       {}", result.tags.title.bright_white());
        println!("  Description: {}", result.tags.description);
        println!("  Keywords:    {}", result.tags.keywords.join(", "));
        println!();

        println!("{}", "Ranking Tips".bright_yellow().bold().underline());
        for tip in &result.tags.tips {
            let priority = match tip.priority {
                TipPriority::High => "HIGH  ".bright_red(),
                TipPriority::Medium => "MEDIUM".yellow(),
                TipPriority::Info => "INFO  ".bright_cyan(),
            };
            println!("  [{}] {}", priority, tip.message);
        }

        println!();
        println!("{}", "=".repeat(80).bright_blue());
    }

    pub fn print_run_entry(entry: &RunEntry) {
        println!(
            "{} #{} {} - {} page(s), avg score {}, {} issue(s) ({} auto-fix, {} escalate) in {:.1}s",
            "Run".bright_cyan().bold(),
            entry.id,
            entry.url,
            entry.pages.len(),
            Self::colored_score(entry.metrics.avg_score),
            entry.metrics.total_issues,
            entry.metrics.auto_fixed,
            entry.metrics.escalated,
            entry.metrics.elapsed
        );
        for page in &entry.pages {
            println!(
                "    {:>3}  {}  ({} issues)",
                Self::colored_score(page.score),
                page.url,
                page.issues.len()
            );
        }
    }

    fn colored_score(score: u8) -> ColoredString {
        let text = score.to_string();
        if score >= 80 {
            text.bright_green()
        } else if score >= 50 {
            text.yellow()
        } else {
            text.bright_red()
        }
    }

    pub fn save_json_report<T: Serialize>(report: &T, filename: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(filename)
            .with_context(|| format!("Failed to create report file: {}", filename))?;
        file.write_all(json.as_bytes())?;
        eprintln!("Report saved to: {}", filename.bright_green());
        Ok(())
    }

    pub fn save_text_report(result: &AuditResult, filename: &str) -> Result<()> {
        std::fs::write(filename, Self::export_text(result))
            .with_context(|| format!("Failed to write report file: {}", filename))?;
        eprintln!("Report saved to: {}", filename.bright_green());
        Ok(())
    }
}
