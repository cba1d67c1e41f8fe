// SPDX-License-Identifier: MIT
#![no_main]

use libfuzzer_sys::fuzz_target;
use tidywatch::rules::{normalize_extension, RuleCatalog};

fuzz_target!(|data: &str| {
    let normalized = normalize_extension(data);

    // Normalization is idempotent
    assert_eq!(normalize_extension(&normalized), normalized);

    // Lookup never panics and agrees with the normalized form
    let catalog = RuleCatalog::builtin();
    let direct = catalog.match_extension(data).map(|r| r.id.clone());
    let via_normalized = catalog.match_extension(&normalized).map(|r| r.id.clone());
    assert_eq!(direct, via_normalized);
});
