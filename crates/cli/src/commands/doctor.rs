use quotecraft_agent::{build_quote_service, describe_provider};
use quotecraft_core::config::{AppConfig, ConfigError, LlmProvider, LoadOptions};
use quotecraft_core::normalize_failure;
use serde::Serialize;

use crate::commands::CommandResult;

const PROBE_KEYWORDS: &str = "perseverance";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool, probe: bool) -> CommandResult {
    run_with_options(LoadOptions::default(), json_output, probe)
}

pub fn run_with_options(options: LoadOptions, json_output: bool, probe: bool) -> CommandResult {
    let report = build_report(options, probe);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 6 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult::plain(exit_code, output);
    }

    CommandResult::plain(exit_code, render_human(&report))
}

fn build_report(options: LoadOptions, probe: bool) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_credentials(&config));
            checks.extend(check_quote_service(&config, probe));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(match error {
                ConfigError::MissingApiKey(provider) => DoctorCheck {
                    name: "provider_credentials",
                    status: CheckStatus::Fail,
                    details: format!(
                        "api key missing for {} (set QUOTECRAFT_LLM_API_KEY)",
                        provider.as_str()
                    ),
                },
                _ => DoctorCheck {
                    name: "provider_credentials",
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                },
            });
            for name in ["quote_service", "generation_probe"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_credentials(config: &AppConfig) -> DoctorCheck {
    let provider = config.llm.provider;
    if !provider.requires_api_key() {
        let details = match provider {
            LlmProvider::Ollama => format!(
                "ollama needs no api key; using {}",
                config.llm.base_url.as_deref().unwrap_or("<unset>")
            ),
            _ => format!("{} provider needs no credentials", provider.as_str()),
        };
        return DoctorCheck { name: "provider_credentials", status: CheckStatus::Skipped, details };
    }

    // A loaded config already guarantees a non-blank key for hosted providers.
    DoctorCheck {
        name: "provider_credentials",
        status: CheckStatus::Pass,
        details: format!("api key present for {}", provider.as_str()),
    }
}

fn check_quote_service(config: &AppConfig, probe: bool) -> Vec<DoctorCheck> {
    let service = match build_quote_service(&config.llm) {
        Ok(service) => service,
        Err(error) => {
            return vec![
                DoctorCheck {
                    name: "quote_service",
                    status: CheckStatus::Fail,
                    details: error.to_string(),
                },
                DoctorCheck {
                    name: "generation_probe",
                    status: CheckStatus::Skipped,
                    details: "skipped because the quote service could not be built".to_string(),
                },
            ];
        }
    };

    let built = DoctorCheck {
        name: "quote_service",
        status: CheckStatus::Pass,
        details: format!("{} ready", describe_provider(&config.llm)),
    };

    if !probe {
        return vec![
            built,
            DoctorCheck {
                name: "generation_probe",
                status: CheckStatus::Skipped,
                details: "pass --probe to send a real generation request".to_string(),
            },
        ];
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                built,
                DoctorCheck {
                    name: "generation_probe",
                    status: CheckStatus::Fail,
                    details: format!("failed to initialize async runtime: {error}"),
                },
            ];
        }
    };

    let probe_check = match runtime.block_on(service.generate(PROBE_KEYWORDS)) {
        Ok(quotes) => DoctorCheck {
            name: "generation_probe",
            status: CheckStatus::Pass,
            details: format!("provider returned {} quote(s)", quotes.len()),
        },
        Err(error) => DoctorCheck {
            name: "generation_probe",
            status: CheckStatus::Fail,
            details: normalize_failure(&error),
        },
    };

    vec![built, probe_check]
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
