use std::fs;
use std::io::{self, Read};
use std::process;

use lm_core::metrics::{new_metric, read_references, MetricError, References};
use lm_core::token::tokenize;
use serde::Serialize;

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

#[derive(Serialize)]
struct EvalReport<'a> {
    metric: &'a str,
    segments: usize,
    score: f64,
    max_score: f64,
}

/// Score hypotheses (one per line, from `hyp_file` or stdin) against
/// parallel reference files.
pub fn eval(metric: &str, ref_files: &[String], hyp_file: Option<&str>, json: bool) {
    if ref_files.is_empty() {
        eprintln!("Error: at least one reference file is required");
        process::exit(1);
    }
    let references = die!(read_references(ref_files), "Error reading references: {}");
    let text = match hyp_file {
        Some(path) => die!(fs::read_to_string(path), "Error reading {path}: {}"),
        None => {
            let mut buf = String::new();
            die!(io::stdin().read_to_string(&mut buf), "Error reading stdin: {}");
            buf
        }
    };
    let report = die!(evaluate(metric, references, &text), "Error: {}");

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).expect("JSON serialization failed")
        );
    } else {
        println!("{metric} = {:.4} ({} segments)", report.score, report.segments);
    }
}

/// Add every line of `hypotheses` to a fresh `metric`.
fn evaluate<'a>(
    metric: &'a str,
    references: References,
    hypotheses: &str,
) -> Result<EvalReport<'a>, MetricError> {
    let mut m = new_metric(metric, references)?;
    for line in hypotheses.lines() {
        m.add(&tokenize(line))?;
    }
    Ok(EvalReport {
        metric,
        segments: m.len(),
        score: m.score(),
        max_score: m.max_score(),
    })
}
