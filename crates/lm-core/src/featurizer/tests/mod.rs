mod cache;
mod wrap;

use std::sync::Arc;

use super::NGramFeaturizer;
use crate::class_map::WordClassMap;
use crate::lm::{BackoffModel, LanguageModel};
use crate::testutil::test_model;

/// Class-level model over DET/NOUN/VERB.
const CLASS_ARPA: &str = "\
\\data\\
ngram 1=5
ngram 2=4

\\1-grams:
-99.0\t<s>\t-0.5
-1.0\t</s>
-0.5\tDET\t-0.2
-0.7\tNOUN\t-0.1
-0.9\tVERB

\\2-grams:
-0.1\t<s> DET
-0.2\tDET NOUN
-0.3\tNOUN VERB
-0.15\tVERB </s>

\\end\\
";

fn class_model() -> Arc<dyn LanguageModel> {
    Arc::new(BackoffModel::from_text("classes", CLASS_ARPA).unwrap())
}

fn class_map() -> Arc<WordClassMap> {
    Arc::new(WordClassMap::from_text("the DET\ncat NOUN\ndog NOUN\nsat VERB\n").unwrap())
}

fn surface(wrap: bool) -> NGramFeaturizer {
    NGramFeaturizer::new(test_model()).with_wrap_boundary(wrap)
}
