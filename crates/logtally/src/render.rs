use std::fmt::Write;

use chrono::NaiveDateTime;
use colored::Colorize;

use logtally_core::{Analysis, BucketStats, Report, TypeShare};

const WIDE_RULE: usize = 120;
const SERVICE_RULE: usize = 60;
const STATS_RULE: usize = 40;

/// Which breakdowns the text report includes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detail {
    pub success: bool,
    pub error: bool,
}

/// Render the text report. Hours with no counted events are never shown.
pub fn render_text(
    analysis: &Analysis,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
    detail: Detail,
) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, analysis, start, end, detail);
    out
}

fn write_report(
    out: &mut String,
    analysis: &Analysis,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
    detail: Detail,
) -> std::fmt::Result {
    let report = &analysis.report;

    writeln!(
        out,
        "{} {} to {}",
        "Analyzing logs from".dimmed(),
        start.format("%Y-%m-%d %H:%M:%S"),
        end.format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(out)?;
    writeln!(out, "{}", rule('=', WIDE_RULE))?;
    writeln!(out, "{}", "LOG ANALYSIS REPORT".bright_blue().bold())?;
    writeln!(out, "{}", rule('=', WIDE_RULE))?;

    if report.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", "No matching log entries in the selected window.".dimmed())?;
    }

    for (service, service_report) in &report.services {
        writeln!(out)?;
        writeln!(out, "{}", rule('=', SERVICE_RULE))?;
        writeln!(out, "{} {}", "SERVICE:".bold(), service.bright_cyan())?;
        writeln!(out, "{}", rule('=', SERVICE_RULE))?;

        for (hour, stats) in &service_report.hours {
            if stats.is_empty() {
                continue;
            }
            writeln!(out)?;
            writeln!(out, "  {} {}", "Hour:".dimmed(), hour)?;
            write_counts(out, "    ", "Success Logs:", "Error Logs  :", stats)?;
            if detail.success && !stats.success_types.is_empty() {
                writeln!(out, "    {}", "Success Breakdown:".dimmed())?;
                write_tags(out, "      ", true, stats.success_types.iter())?;
            }
            if detail.error && !stats.error_types.is_empty() {
                writeln!(out, "    {}", "Error Breakdown:".dimmed())?;
                write_tags(out, "      ", false, stats.error_types.iter())?;
            }
        }

        let totals = &service_report.totals;
        writeln!(out)?;
        writeln!(out, "  {}", "Service Summary:".bold())?;
        write_counts(out, "    ", "Total Success:", "Total Errors :", totals)?;
        if detail.success && !totals.success_types.is_empty() {
            writeln!(out, "    {}", "Success Types Summary:".dimmed())?;
            write_tags(out, "      ", true, totals.success_types.iter())?;
        }
        if detail.error && !totals.error_types.is_empty() {
            writeln!(out, "    {}", "Error Types Summary:".dimmed())?;
            write_tags(out, "      ", false, totals.error_types.iter())?;
        }
        if totals.error_count > 0 {
            writeln!(
                out,
                "    {} {}",
                "Error Rate   :".dimmed(),
                format!("{:.2}%", totals.error_rate()).bright_red()
            )?;
        } else if totals.success_count > 0 {
            writeln!(
                out,
                "    {} {}",
                "Success Rate :".dimmed(),
                "100.00%".bright_green()
            )?;
        }
    }

    write_overall(out, report, detail)?;
    write_statistics(out, report)?;

    if !analysis.failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", "SKIPPED SERVICES:".bright_yellow().bold())?;
        for failure in &analysis.failures {
            writeln!(out, "  {} {}", "!".bright_yellow(), failure)?;
        }
    }

    Ok(())
}

fn write_overall(out: &mut String, report: &Report, detail: Detail) -> std::fmt::Result {
    let grand = &report.grand_total;

    writeln!(out)?;
    writeln!(out, "{}", rule('=', WIDE_RULE))?;
    writeln!(out, "{}", "OVERALL SUMMARY:".bold())?;
    writeln!(out, "{}", rule('=', WIDE_RULE))?;
    write_counts(out, "", "Total Success Logs:", "Total Error Logs  :", grand)?;
    if grand.is_empty() {
        return Ok(());
    }
    writeln!(
        out,
        "{} {:.2}%",
        "Overall Error Rate:".dimmed(),
        grand.error_rate()
    )?;

    if detail.success {
        write_shares(out, "Overall Success Types:", true, &report.success_type_shares())?;
    }
    if detail.error {
        write_shares(out, "Overall Error Types:", false, &report.error_type_shares())?;
    }
    Ok(())
}

fn write_statistics(out: &mut String, report: &Report) -> std::fmt::Result {
    let grand = &report.grand_total;
    if grand.is_empty() {
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "{}", rule('=', STATS_RULE))?;
    writeln!(out, "{}", "ADDITIONAL STATISTICS:".bold())?;
    writeln!(out, "{}", rule('=', STATS_RULE))?;
    writeln!(out, "{} {}", "Total Logs Processed :".dimmed(), grand.total())?;
    writeln!(out, "{} {:.2}%", "Success Rate         :".dimmed(), grand.success_rate())?;
    writeln!(out, "{} {:.2}%", "Error Rate           :".dimmed(), grand.error_rate())?;
    writeln!(
        out,
        "{} {}:{}",
        "Success to Error Ratio:".dimmed(),
        grand.success_count,
        grand.error_count
    )?;
    writeln!(out, "{} {}", "Active Services      :".dimmed(), report.active_services())?;
    Ok(())
}

fn write_counts(
    out: &mut String,
    indent: &str,
    success_label: &str,
    error_label: &str,
    stats: &BucketStats,
) -> std::fmt::Result {
    writeln!(
        out,
        "{}{} {}",
        indent,
        success_label.dimmed(),
        stats.success_count.to_string().bright_green()
    )?;
    writeln!(
        out,
        "{}{} {}",
        indent,
        error_label.dimmed(),
        stats.error_count.to_string().bright_red()
    )
}

fn write_tags<'a>(
    out: &mut String,
    indent: &str,
    success: bool,
    tags: impl Iterator<Item = (&'a String, &'a u64)>,
) -> std::fmt::Result {
    for (tag, count) in tags {
        writeln!(out, "{}{} {}: {}", indent, marker(success), tag, count)?;
    }
    Ok(())
}

fn write_shares(
    out: &mut String,
    title: &str,
    success: bool,
    shares: &[TypeShare],
) -> std::fmt::Result {
    if shares.is_empty() {
        return Ok(());
    }
    writeln!(out, "{}", title.dimmed())?;
    for share in shares {
        writeln!(
            out,
            "  {} {}: {} ({:.1}%)",
            marker(success),
            share.tag,
            share.count,
            share.percent
        )?;
    }
    Ok(())
}

fn marker(success: bool) -> colored::ColoredString {
    if success {
        "✓".bright_green()
    } else {
        "✗".bright_red()
    }
}

fn rule(c: char, width: usize) -> String {
    std::iter::repeat(c).take(width).collect()
}
