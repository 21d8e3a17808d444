#![no_main]

use fdash_core::{OptionCatalog, SelectionValue, reconcile_value};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Some((&multi, rest)) = data.split_first() else {
        return;
    };
    let multi = multi & 1 == 1;
    let text = String::from_utf8_lossy(rest);
    let Some((options_raw, value_raw)) = text.split_once('\n') else {
        return;
    };
    let Ok(options) = serde_json::from_str::<Value>(options_raw) else {
        return;
    };
    let Ok(value) = serde_json::from_str::<Value>(value_raw) else {
        return;
    };
    let Ok(catalog) = OptionCatalog::from_json(&options) else {
        return;
    };
    let Ok(selection) = SelectionValue::from_json(&value, multi, "fuzz") else {
        return;
    };

    let once = reconcile_value(&selection, &catalog);
    assert_eq!(once.is_multi(), multi, "shape changed");
    assert_eq!(reconcile_value(&once, &catalog), once, "not idempotent");

    // Canonical catalogs re-parse to themselves.
    let canonical = OptionCatalog::from_json(&catalog.to_json()).expect("canonical reparses");
    assert_eq!(canonical, catalog);
});
