use std::fs;
use std::process;

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

pub fn settings_export() {
    print!("{}", lm_core::settings::default_toml());
}

pub fn settings_validate(file: &str) {
    let content = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let s = die!(
        lm_core::settings::parse_settings_toml(&content),
        "Error: {}"
    );
    println!(
        "OK: scoring.wrap_boundary={}, lm.oov_log_prob={}, metrics.bleu_order={}",
        s.scoring.wrap_boundary, s.lm.oov_log_prob, s.metrics.bleu_order
    );
}

pub fn engine_validate(file: &str) {
    let config = die!(
        lm_engine::EngineConfig::load(std::path::Path::new(file)),
        "Error: {}"
    );
    for f in &config.featurizers {
        let class = match (&f.class_based, &f.class_map) {
            (false, _) => "surface".to_string(),
            (true, Some(map)) => format!("classes from {}", map.display()),
            (true, None) => "classes from default map".to_string(),
        };
        println!("{}\t{}\t{class}", f.name, f.model.display());
    }
    println!("OK: {} featurizers", config.featurizers.len());
}
