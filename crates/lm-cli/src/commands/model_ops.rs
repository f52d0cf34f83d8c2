use std::path::Path;
use std::process;

use lm_core::lm::{BackoffModel, LanguageModel};

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

pub fn compile(arpa_file: &str, output_file: &str) {
    let model = die!(
        BackoffModel::load_arpa(Path::new(arpa_file)),
        "Error reading ARPA model: {}"
    );
    let total: usize = model.ngram_counts().iter().sum();
    eprintln!(
        "Compiling {} (order {}, {total} n-grams)...",
        model.name(),
        model.order()
    );
    die!(
        model.save(Path::new(output_file)),
        "Error writing model image: {}"
    );
    eprintln!("Wrote {output_file}");
}

pub fn info(file: &str) {
    let model = die!(BackoffModel::load(Path::new(file)), "Error opening model: {}");
    println!("name:   {}", model.name());
    println!("order:  {}", model.order());
    for (i, count) in model.ngram_counts().iter().enumerate() {
        println!("{}-grams: {count}", i + 1);
    }
}
