use std::io::{IsTerminal, Write};
use std::time::Duration;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One answered completion request.
#[derive(Debug, Clone, Serialize)]
pub struct PingReply {
    pub ticket: u64,
    pub latency_us: u64,
    pub completions: usize,
}

impl PingReply {
    pub fn new(ticket: u64, latency: Duration, completions: usize) -> Self {
        Self {
            ticket,
            latency_us: u64::try_from(latency.as_micros()).unwrap_or(u64::MAX),
            completions,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PingReport<'a> {
    pub backend: &'a str,
    pub endpoint: Option<String>,
    pub sent: usize,
    pub received: usize,
    pub restarts: u64,
    pub replies: &'a [PingReply],
    pub min_us: Option<u64>,
    pub avg_us: Option<u64>,
    pub max_us: Option<u64>,
}

impl<'a> PingReport<'a> {
    pub fn new(backend: &'a str, sent: usize, replies: &'a [PingReply]) -> Self {
        let latencies = replies.iter().map(|r| r.latency_us);
        let avg_us = (!replies.is_empty())
            .then(|| latencies.clone().sum::<u64>() / replies.len() as u64);
        Self {
            backend,
            endpoint: None,
            sent,
            received: replies.len(),
            restarts: 0,
            replies,
            min_us: latencies.clone().min(),
            avg_us,
            max_us: latencies.max(),
        }
    }
}

pub fn print_ping(report: &PingReport<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TICKET", "LATENCY", "COMPLETIONS"]);
            for reply in report.replies {
                table.add_row(vec![
                    reply.ticket.to_string(),
                    format_micros(reply.latency_us),
                    reply.completions.to_string(),
                ]);
            }
            println!("{table}");
            println!("{}", summary(report));
        }
        OutputFormat::Pretty => {
            for reply in report.replies {
                println!(
                    "ticket={} time={} completions={}",
                    reply.ticket,
                    format_micros(reply.latency_us),
                    reply.completions
                );
            }
            println!("{}", summary(report));
        }
        OutputFormat::Raw => {
            let mut out = std::io::stdout();
            for reply in report.replies {
                let _ = writeln!(out, "{}", reply.latency_us);
            }
            let _ = out.flush();
        }
    }
}

fn summary(report: &PingReport<'_>) -> String {
    let mut line = format!(
        "{} requests sent, {} answered",
        report.sent, report.received
    );
    if let (Some(min), Some(avg), Some(max)) = (report.min_us, report.avg_us, report.max_us) {
        line.push_str(&format!(
            ", min/avg/max = {}/{}/{}",
            format_micros(min),
            format_micros(avg),
            format_micros(max)
        ));
    }
    if report.restarts > 0 {
        line.push_str(&format!(", {} worker restarts", report.restarts));
    }
    line
}

pub fn format_micros(us: u64) -> String {
    if us >= 1_000 {
        format!("{:.2}ms", us as f64 / 1_000.0)
    } else {
        format!("{us}us")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_statistics() {
        let replies = vec![
            PingReply::new(1, Duration::from_micros(300), 5),
            PingReply::new(2, Duration::from_micros(900), 5),
        ];
        let report = PingReport::new("backend", 3, &replies);
        assert_eq!(report.received, 2);
        assert_eq!(report.min_us, Some(300));
        assert_eq!(report.avg_us, Some(600));
        assert_eq!(report.max_us, Some(900));
        assert_eq!(
            summary(&report),
            "3 requests sent, 2 answered, min/avg/max = 300us/600us/900us"
        );
    }

    #[test]
    fn empty_report_has_no_statistics() {
        let report = PingReport::new("backend", 1, &[]);
        assert_eq!(report.avg_us, None);
        assert_eq!(summary(&report), "1 requests sent, 0 answered");
    }

    #[test]
    fn micros_switch_to_millis() {
        assert_eq!(format_micros(999), "999us");
        assert_eq!(format_micros(1_500), "1.50ms");
    }
}
