mod env_vars;
mod output_config;

pub use output_config::{
    Configuration,
    HttpConfig,
    OutputConfig,
    OutputKind,
    S3Config,
    TlsConfig,
};

pub use env_vars::expand_env_vars;
