mod concurrency;
mod proptest_cache;

use std::sync::Arc;

use lm_core::featurizer::NGramFeaturizer;
use lm_core::lm::BackoffModel;
use lm_core::token::{tokenize, Token};

use super::DecodingSession;

pub(super) const TEST_ARPA: &str = "\
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

pub(super) fn lm_feature(name: &str) -> Arc<NGramFeaturizer> {
    let model = Arc::new(BackoffModel::from_text("test", TEST_ARPA).unwrap());
    Arc::new(
        NGramFeaturizer::new(model)
            .with_name(name)
            .with_wrap_boundary(false),
    )
}

pub(super) fn phrases(segmented: &str) -> Vec<Vec<Token>> {
    segmented.split('|').map(tokenize).collect()
}

pub(super) fn unconstrained() -> DecodingSession {
    DecodingSession::new(vec![lm_feature("LM")])
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}
