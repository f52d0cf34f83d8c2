use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process;
use std::sync::Arc;

use lm_core::featurizer::{FeatureValue, NGramFeaturizer};
use lm_core::lm;
use lm_core::token::{detokenize, tokenize, Token};
use lm_engine::LmEngine;
use serde::Serialize;

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

/// Separator between phrases of one input sentence.
pub const PHRASE_SEPARATOR: char = '|';

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InputError {
    #[error("phrase {0} is empty")]
    EmptyPhrase(usize),
    #[error("no phrases")]
    Empty,
}

/// Split `the cat | sat on` into phrases.
pub fn parse_segmented(line: &str) -> Result<Vec<Vec<Token>>, InputError> {
    if line.trim().is_empty() {
        return Err(InputError::Empty);
    }
    line.split(PHRASE_SEPARATOR)
        .enumerate()
        .map(|(i, p)| {
            let phrase = tokenize(p);
            if phrase.is_empty() {
                Err(InputError::EmptyPhrase(i + 1))
            } else {
                Ok(phrase)
            }
        })
        .collect()
}

#[derive(Serialize)]
struct PhraseScore {
    phrase: String,
    features: BTreeMap<String, f64>,
    total: f64,
}

#[derive(Serialize)]
struct SentenceScore {
    sentence: String,
    phrases: Vec<PhraseScore>,
    total: f64,
}

fn feature_map(values: &[FeatureValue]) -> BTreeMap<String, f64> {
    values
        .iter()
        .map(|v| (v.name.to_string(), v.value))
        .collect()
}

/// An engine config (`.toml`) or a single model file scored as `LM`.
fn open_engine(model: &str) -> LmEngine {
    let path = Path::new(model);
    if path.extension().is_some_and(|e| e == "toml") {
        return die!(LmEngine::open(path), "Error opening engine: {}");
    }
    let lm = die!(lm::load(path), "Error opening model: {}");
    LmEngine::from_features(vec![Arc::new(NGramFeaturizer::new(lm))])
}

fn read_input(input: Option<&str>) -> String {
    match input {
        Some(path) => die!(fs::read_to_string(path), "Error reading {path}: {}"),
        None => {
            let mut buf = String::new();
            die!(io::stdin().read_to_string(&mut buf), "Error reading stdin: {}");
            buf
        }
    }
}

/// Score segmented sentences, one per line. With a prefix, every line is
/// a hypothesis of the same constrained sentence and they share one
/// session and its prefix caches.
pub fn score(model: &str, input: Option<&str>, prefix: Option<&str>, json: bool) {
    let engine = open_engine(model);
    let mut session = match prefix {
        Some(p) => engine.create_constrained_session(&tokenize(p)),
        None => engine.create_session(),
    };

    for (i, line) in read_input(input).lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let phrases = die!(parse_segmented(line), "Error at line {}: {}", i + 1);
        if prefix.is_none() {
            session.reset();
        }
        let steps = die!(
            session.score_segmentation(&phrases),
            "Error at line {}: {}",
            i + 1
        );

        let result = SentenceScore {
            sentence: detokenize(&phrases.concat()),
            total: steps.iter().map(|s| s.total).sum(),
            phrases: phrases
                .iter()
                .zip(&steps)
                .map(|(p, s)| PhraseScore {
                    phrase: detokenize(p),
                    features: feature_map(&s.features),
                    total: s.total,
                })
                .collect(),
        };

        if json {
            println!(
                "{}",
                serde_json::to_string(&result).expect("JSON serialization failed")
            );
        } else {
            let segs: Vec<String> = result
                .phrases
                .iter()
                .map(|p| format!("{}({:.4})", p.phrase, p.total))
                .collect();
            println!("{:.4}\t{}", result.total, segs.join(" | "));
        }
    }
}

/// Context-free score of one phrase under every feature.
pub fn isolated(model: &str, phrase: &str) {
    let engine = open_engine(model);
    let values = die!(engine.option_scores(&tokenize(phrase)), "Error: {}");
    for v in values {
        println!("{}\t{:.4}", v.name, v.value);
    }
}
