// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

#![no_main]

use aegis::config::MediationConfig;
use aegis::engine::{HeuristicInjectionScorer, RegexSensitiveScorer};
use aegis::engine_core::traits::{InjectionScorer, SensitiveScorer};
use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct DetectionInput {
    text: String,
    redact: bool,
    threshold: u8,
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);
    let Ok(input) = DetectionInput::arbitrary(&mut unstructured) else {
        return;
    };

    let config = MediationConfig {
        pii_scan_redact: input.redact,
        pii_scan_threshold: f64::from(input.threshold) / 255.0,
        ..MediationConfig::default()
    };

    if let Ok(verdict) = HeuristicInjectionScorer::new().score_injection(&input.text, &config) {
        assert!((0.0..=1.0).contains(&verdict.score));
    }

    if let Ok(verdict) = RegexSensitiveScorer::new().score_sensitive(&input.text, &config) {
        assert!((0.0..=1.0).contains(&verdict.score));
        assert_eq!(verdict.valid, verdict.entities.is_empty());
        if verdict.valid || !input.redact {
            assert_eq!(verdict.redacted, input.text);
        }
    }
});
