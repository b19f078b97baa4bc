use super::ConverterConfig;
use crate::core::error::PipelineError;
use regex::Regex;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &ConverterConfig) -> Result<(), PipelineError> {
        if config.imports.blocklist.iter().any(|b| b.trim().is_empty()) {
            return Err(invalid("imports.blocklist entries cannot be empty"));
        }

        for pattern in config
            .filter
            .platform_call_patterns
            .iter()
            .chain(config.filter.bootstrap_patterns.iter())
        {
            Regex::new(pattern)
                .map_err(|e| invalid(format!("invalid filter pattern '{}': {}", pattern, e)))?;
        }

        if config.filter.comment_prefixes.iter().any(|p| p.is_empty()) {
            return Err(invalid("filter.comment_prefixes entries cannot be empty"));
        }

        if !(1..=8).contains(&config.procedure.indent_width) {
            return Err(invalid("procedure.indent_width must be between 1 and 8"));
        }

        if !is_identifier(&config.procedure.entry_point) {
            return Err(invalid(format!(
                "procedure.entry_point '{}' is not a valid identifier",
                config.procedure.entry_point
            )));
        }

        if !is_identifier(&config.procedure.context_param) {
            return Err(invalid(format!(
                "procedure.context_param '{}' is not a valid identifier",
                config.procedure.context_param
            )));
        }

        if config.procedure.log_table.trim().is_empty() {
            return Err(invalid("procedure.log_table cannot be empty"));
        }

        if config.procedure.script_extension.trim().is_empty() {
            return Err(invalid("procedure.script_extension cannot be empty"));
        }

        if config.extractor.program.trim().is_empty() {
            return Err(invalid("extractor.program cannot be empty"));
        }

        if !config.extractor.args.iter().any(|a| a.contains("{input}")) {
            return Err(invalid("extractor.args must reference {input}"));
        }

        let timeout = config
            .extractor
            .timeout_duration()
            .map_err(|e| invalid(format!("extractor.timeout: {}", e)))?;
        if timeout.is_zero() {
            return Err(invalid("extractor.timeout must be greater than zero"));
        }

        if config.extractor.output_extensions.is_empty() {
            return Err(invalid("extractor.output_extensions cannot be empty"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> PipelineError {
    PipelineError::Config(message.into())
}

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}
