pub mod config_ops;
pub mod eval_ops;
pub mod model_ops;
pub mod score_ops;
