//! Shared fixtures for unit tests: a small trigram model and an oracle
//! wrapper that records every call it receives.

use std::sync::{Arc, Mutex};

use crate::lm::{BackoffModel, LanguageModel, LmState};
use crate::token::Token;

pub(crate) const TEST_ARPA: &str = "\
This preamble is ignored.

\\data\\
ngram 1=8
ngram 2=6
ngram 3=2

\\1-grams:
-99.0\t<s>\t-0.5
-1.0\t</s>
-1.2\tthe\t-0.4
-1.5\tcat\t-0.3
-1.6\tsat\t-0.2
-1.8\tdog\t-0.3
-2.0\t<unk>
-1.4\ton\t-0.2

\\2-grams:
-0.3\t<s> the\t-0.1
-0.5\tthe cat\t-0.2
-0.6\tcat sat\t-0.1
-0.4\tsat </s>
-0.7\tthe dog
-0.8\tsat on

\\3-grams:
-0.2\t<s> the cat
-0.25\tthe cat sat

\\end\\
";

pub(crate) fn test_model() -> Arc<BackoffModel> {
    Arc::new(BackoffModel::from_text("test", TEST_ARPA).unwrap())
}

/// One recorded oracle invocation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OracleCall {
    pub sequence: Vec<Token>,
    pub start_index: usize,
    pub had_prior: bool,
}

/// Delegates to an inner model and remembers every `score` call.
pub(crate) struct RecordingModel {
    inner: Arc<dyn LanguageModel>,
    calls: Mutex<Vec<OracleCall>>,
}

impl RecordingModel {
    pub fn new(inner: Arc<dyn LanguageModel>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<OracleCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl LanguageModel for RecordingModel {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn order(&self) -> usize {
        self.inner.order()
    }

    fn start_token(&self) -> Token {
        self.inner.start_token()
    }

    fn end_token(&self) -> Token {
        self.inner.end_token()
    }

    fn score(&self, sequence: &[Token], start_index: usize, prior: Option<&LmState>) -> LmState {
        self.calls.lock().unwrap().push(OracleCall {
            sequence: sequence.to_vec(),
            start_index,
            had_prior: prior.is_some(),
        });
        self.inner.score(sequence, start_index, prior)
    }
}

pub(crate) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-5,
        "expected {expected}, got {actual}"
    );
}
